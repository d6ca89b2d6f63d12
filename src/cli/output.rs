//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so every command
//! is styled the same way.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::backend::format::RecordHeader;
use crate::vault::PersistenceId;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of stored records (Id, Type, Length, Created).
pub fn print_records_table(records: &[(PersistenceId, RecordHeader)]) {
    if records.is_empty() {
        info("No secrets in this vault yet.");
        tip("Run `keyvault generate <TYPE>` to create your first secret.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Type", "Length", "Created"]);

    for (id, header) in records {
        table.add_row(vec![
            id.to_string(),
            header.attributes.secret_type.to_string(),
            header.attributes.length.to_string(),
            header.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print the attributes of one record as a two-column table.
pub fn print_record(id: &PersistenceId, header: &RecordHeader) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Id".to_string(), id.to_string()]);
    table.add_row(vec![
        "Type".to_string(),
        header.attributes.secret_type.to_string(),
    ]);
    table.add_row(vec![
        "Length".to_string(),
        header.attributes.length.to_string(),
    ]);
    table.add_row(vec![
        "Persistence".to_string(),
        format!("{:?}", header.attributes.persistence).to_lowercase(),
    ]);
    table.add_row(vec![
        "Created".to_string(),
        header.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    ]);
    table.add_row(vec![
        "Format version".to_string(),
        header.version.to_string(),
    ]);
    println!("{table}");
}
