//! `keyvault completions <shell>`: print a completion script to stdout.
//!
//! The script is built from the same clap definition the binary parses,
//! so new subcommands and flags show up without touching this file.

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;
use crate::errors::Result;

pub fn execute(shell: Shell) -> Result<()> {
    let stdout = io::stdout();
    write_script(shell, &mut stdout.lock())
}

/// Render the completion script for `shell` into `out`.
pub fn write_script(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin_name, out);
    out.flush()?;
    Ok(())
}
