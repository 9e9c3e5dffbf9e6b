// mocolink-api: Async Rust client for the motion-control link adapter HTTP service

pub mod client;
pub mod envelope;
pub mod error;
pub mod transport;
pub mod types;

pub use client::LinkClient;
pub use envelope::Envelope;
pub use error::Error;
