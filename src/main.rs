use clap::Parser;
use keyvault::cli::{Cli, Commands};
use keyvault::config::Settings;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Generate {
            ref secret_type,
            length,
        } => keyvault::cli::commands::generate::execute(&cli, secret_type, length),
        Commands::Import {
            ref secret_type,
            ref value,
            encoding,
        } => keyvault::cli::commands::import_cmd::execute(
            &cli,
            secret_type,
            value.as_deref(),
            encoding,
        ),
        Commands::Export { ref id, encoding } => {
            keyvault::cli::commands::export::execute(&cli, id, encoding)
        }
        Commands::PublicKey { ref id } => keyvault::cli::commands::public_key::execute(&cli, id),
        Commands::Info { ref id } => keyvault::cli::commands::info::execute(&cli, id),
        Commands::Destroy { ref id, force } => {
            keyvault::cli::commands::destroy::execute(&cli, id, force)
        }
        Commands::List => keyvault::cli::commands::list::execute(&cli),
        Commands::Sha256 {
            ref input,
            ref file,
        } => keyvault::cli::commands::sha256::execute(&cli, input.as_deref(), file.as_deref()),
        Commands::Version => keyvault::cli::commands::version::execute(),
        Commands::Completions { shell } => keyvault::cli::commands::completions::execute(shell),
        Commands::Audit { last, ref since } => audit(&cli, last, since.as_deref()),
    };

    if let Err(e) = result {
        keyvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// `KEYVAULT_LOG` wins, then `--verbose`, then `log_filter` from keyvault.toml.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env("KEYVAULT_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("keyvault=debug")
        } else {
            let configured = std::env::current_dir()
                .ok()
                .and_then(|cwd| Settings::load(&cwd).ok())
                .unwrap_or_default()
                .log_filter;
            EnvFilter::try_new(configured).unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    });

    // Logs go to stderr; stdout carries ids, keys and digests.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "audit-log")]
fn audit(cli: &Cli, last: usize, since: Option<&str>) -> keyvault::errors::Result<()> {
    keyvault::cli::commands::audit_cmd::execute(cli, last, since)
}

#[cfg(not(feature = "audit-log"))]
fn audit(_cli: &Cli, _last: usize, _since: Option<&str>) -> keyvault::errors::Result<()> {
    Err(keyvault::errors::VaultError::CommandFailed(
        "this build has no audit log (enable the `audit-log` feature)".into(),
    ))
}
