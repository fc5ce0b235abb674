mod bot;
mod config_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use sockbot_provider::Capability;

#[derive(Parser)]
#[command(name = "sockbot", about = "sockbot, an IRC bot with plugins", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ./sockbot.{toml,yaml,yml,json}, then the user
    /// config dir).
    #[arg(long, short, global = true, env = "SOCKBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Connect and run the bot until Ctrl-C (default).
    Run,
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print which forum capabilities the IRC provider supports.
    Capabilities,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn print_capabilities() {
    for capability in Capability::ALL {
        let mark = if capability.is_supported() {
            "yes"
        } else {
            "no"
        };
        println!("{:<16} {mark}", capability.as_str());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Run) => {
            init_telemetry(&cli);
            info!(version = env!("CARGO_PKG_VERSION"), "sockbot starting");
            bot::run(cli.config.as_deref()).await
        },
        Some(Commands::Check { verbose }) => config_commands::check(cli.config.as_deref(), verbose),
        Some(Commands::Capabilities) => {
            print_capabilities();
            Ok(())
        },
    }
}
