use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use qs_cli::cli::{self, Cli, Command, ConfigCommand};
use qs_domain::config::LoggingConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::Version = cli.command {
        println!("qsched {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (config, config_path) = cli::load_config(cli.config.as_deref())?;
    init_tracing(&config.logging, cli.log_json);

    match cli.command {
        Command::Schedule(args) => cli::schedule::run(&config, &args),
        Command::Distribute {
            contact_id,
            email,
            dry_run,
        } => {
            cli::require_valid(&config, &config_path)?;
            cli::distribute::run(&config, &contact_id, email, dry_run)
        }
        Command::Export(args) => cli::export::run(&config, &args),
        Command::Config(ConfigCommand::Validate) => {
            if !cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => cli::config::show(&config),
        Command::Version => Ok(()),
    }
}

/// Stderr tracing so stdout stays clean for command output.
///
/// `RUST_LOG` wins over `logging.filter`.
fn init_tracing(logging: &LoggingConfig, force_json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if force_json || logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
