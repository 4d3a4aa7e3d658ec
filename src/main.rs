use bing_wall::config::{self, ConfigPatch};
use bing_wall::pipeline::{self, Services};
use bing_wall::{daemon, output};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash} ({})", env!("BUILD_DATE")).into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "bing-wall")]
#[command(about = "Sets the Bing image of the day as your desktop wallpaper")]
#[command(long_about = "\
Sets the Bing image of the day as your desktop wallpaper

The image is downloaded for the chosen region and resolution, optionally
dimmed, framed with a watermark, captioned with its title and copyright
(translated for non-English regions, with readings for Japanese), stamped
with a QR code linking to its search page, saved as PNG and applied.

Settings are layered: built-in defaults, then config.toml, then flags.
In daemon mode the settings can be changed at runtime:

  curl http://127.0.0.1:44244/config
  curl -X PATCH 'http://127.0.0.1:44244/config?refresh=true' -d '{\"region\": \"ja-JP\"}'
  curl -X POST http://127.0.0.1:44244/refresh
  curl -X POST http://127.0.0.1:44244/speak

Run 'bing-wall gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, decorate and apply the wallpaper once
    Run(ConfigPatch),
    /// Apply the wallpaper, then serve the HTTP API until Ctrl-C
    Daemon(ConfigPatch),
    /// Print a stock config.toml with all options documented
    GenConfig,
    /// List the embedded fonts and watermarks
    Assets,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// A token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            trigger.cancel();
        }
    });
    cancel
}

/// Config file overlaid with the command-line flags.
fn resolve_config(
    path: Option<&std::path::Path>,
    flags: &ConfigPatch,
) -> Result<config::AppConfig, config::ConfigError> {
    let base = config::load_config(path)?;
    let (config, _) = flags.applied_to(&base)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Command::Run(flags) => {
            let config = resolve_config(cli.config.as_deref(), &flags)?;
            let services = Services::from_config(&config)?;
            let cancel = cancel_on_ctrl_c();

            let run = pipeline::run_pipeline(&config, &services, true, &cancel).await?;
            output::print_run_summary(&run, &config);
            if let Some(failure) = run.failure {
                return Err(failure.into());
            }
        }
        Command::Daemon(flags) => {
            let config = resolve_config(cli.config.as_deref(), &flags)?;
            let services = Services::from_config(&config)?;
            daemon::run_daemon(config, services, cancel_on_ctrl_c()).await?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Assets => {
            output::print_assets();
        }
    }

    Ok(())
}
