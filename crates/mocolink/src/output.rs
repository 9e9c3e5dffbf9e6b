//! Table rendering helpers shared by the command handlers.

use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Render rows as a table on stdout, or a placeholder when empty.
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        println!("{empty_message}");
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{table}");
}
