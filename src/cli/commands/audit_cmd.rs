//! `keyvault audit`: display the audit log.
//!
//! Usage:
//!   keyvault audit               # show last 50 entries
//!   keyvault audit --last 20     # show last 20
//!   keyvault audit --since 7d    # entries from last 7 days

use chrono::{DateTime, Duration, Utc};

use crate::audit::{AuditEntry, AuditLog};
use crate::cli::output;
use crate::cli::{vault_dir, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let since_dt = since.map(parse_duration).transpose()?;

    let dir = vault_dir(cli)?;
    if !dir.is_dir() {
        output::info("No audit entries found.");
        return Ok(());
    }

    let audit = AuditLog::open(&dir)
        .ok_or_else(|| VaultError::AuditError("failed to open audit database".into()))?;
    let entries = audit.query(last, since_dt)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);
    Ok(())
}

/// Parse "7d", "24h" or "30m" into the point in time that long ago.
fn parse_duration(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        VaultError::CommandFailed(format!(
            "invalid duration '{input}', use a format like 7d, 24h, or 30m"
        ))
    };

    let split = input.len().checked_sub(1).ok_or_else(invalid)?;
    if !input.is_char_boundary(split) {
        return Err(invalid());
    }
    let (num_str, unit) = input.split_at(split);
    let num: i64 = num_str.parse().map_err(|_| invalid())?;

    let duration = match unit {
        "d" => Duration::try_days(num),
        "h" => Duration::try_hours(num),
        "m" => Duration::try_minutes(num),
        _ => None,
    }
    .ok_or_else(invalid)?;

    Ok(Utc::now() - duration)
}

/// Print audit entries in a formatted table.
fn print_audit_table(entries: &[AuditEntry]) {
    use comfy_table::{ContentArrangement, Table};
    use console::style;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Secret", "Details"]);

    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            colorize_operation(&entry.operation),
            entry.secret_id.as_deref().unwrap_or("-").to_string(),
            entry.details.as_deref().unwrap_or("-").to_string(),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

fn colorize_operation(op: &str) -> String {
    use console::style;

    match op {
        "generate" | "import" => style(op).green().to_string(),
        "destroy" => style(op).red().to_string(),
        "export" => style(op).yellow().to_string(),
        _ => op.to_string(),
    }
}
