use std::{path::PathBuf, str::FromStr};

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use ragswitch_protocol::VersionSlot;

#[derive(Parser)]
#[command(name = "ragswitch", about = "ragswitch — blue/green retrieval index deployment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Directory to search for ragswitch.{toml,yaml,yml,json} instead of the
    /// standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the knowledge directory and rebuild/activate on changes.
    Builder,
    /// Serve the request router.
    Router,
    /// Serve the query backend for one version slot.
    Backend {
        #[arg(long, value_parser = VersionSlot::from_str)]
        slot: VersionSlot,
    },
    /// Rebuild one slot once and exit.
    Rebuild {
        #[arg(long, value_parser = VersionSlot::from_str)]
        slot: VersionSlot,
        /// Also point the router at the freshly built slot.
        #[arg(long, default_value_t = false)]
        activate: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    if let Some(dir) = &cli.config {
        ragswitch_config::set_config_dir(dir.clone());
    }
    let config = ragswitch_config::discover_and_load();

    info!(version = env!("CARGO_PKG_VERSION"), "ragswitch starting");

    match cli.command {
        Commands::Builder => {
            ragswitch_builder::BuilderService::new(&config).run().await
        },
        Commands::Router => ragswitch_router::start_router(config).await,
        Commands::Backend { slot } => {
            ragswitch_backend::server::start_backend(config, slot).await
        },
        Commands::Rebuild { slot, activate } => run_rebuild(&config, slot, activate).await,
    }
}

/// One-shot rebuild, the operational escape hatch next to the watch loop.
async fn run_rebuild(
    config: &ragswitch_config::RagswitchConfig,
    slot: VersionSlot,
    activate: bool,
) -> anyhow::Result<()> {
    let service = ragswitch_builder::BuilderService::new(config);
    std::fs::create_dir_all(service.layout().indices_dir())?;

    let outcome = ragswitch_builder::pipeline::rebuild_slot(
        service.layout(),
        service.embedder(),
        slot,
    )
    .await?;

    match outcome {
        Some(outcome) => {
            println!(
                "rebuilt {slot}: {} documents, dimension {}",
                outcome.documents, outcome.dimensions
            );
            if activate {
                let client = reqwest::Client::new();
                let active = ragswitch_builder::pipeline::activate(
                    &client,
                    &config.builder.router_url,
                    slot,
                    config.builder.activate_timeout(),
                )
                .await?;
                println!("activated {active}");
            }
            Ok(())
        },
        None => {
            println!("knowledge directory is empty, nothing to build");
            Ok(())
        },
    }
}
