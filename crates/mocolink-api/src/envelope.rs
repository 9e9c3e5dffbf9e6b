//! Response envelope shared by every link adapter endpoint.
//!
//! Every response body has the shape `{ "result": ..., "message": ...,
//! "data": ... }`. The service signals rejection exclusively through
//! the presence of `message`; the `result` value is decorative and is
//! never consulted.

use serde::Deserialize;

use crate::error::Error;

/// Wire envelope wrapping every link adapter response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Interpret the envelope: success iff no `message` is present.
    pub fn into_result(self) -> Result<Option<T>, Error> {
        match self.message {
            Some(message) => Err(Error::Api { message }),
            None => Ok(self.data),
        }
    }
}
