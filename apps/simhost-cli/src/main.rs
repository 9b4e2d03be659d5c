use anyhow::Context as _;
use clap::{Parser, Subcommand};
use simhost_kernel::{GameConfiguration, Server, ServerConfig};
use tracing_subscriber::EnvFilter;

mod demo;

#[derive(Parser)]
#[command(name = "simhost-cli", about = "Run and inspect the simhost server core")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server loop with the demo game configuration
    Run {
        /// Stop after this many ticks (runs until Ctrl-C if omitted)
        #[arg(short, long)]
        ticks: Option<u64>,
        /// Fixed tick interval in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,
        /// YAML server config file; CLI flags override its values
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Print version and the effective default configuration
    Info,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Run {
            ticks,
            interval_ms,
            config,
        } => {
            let mut server_config = match config {
                Some(path) => load_config(&path)?,
                None => ServerConfig::default(),
            };
            if let Some(ticks) = ticks {
                server_config.max_ticks = Some(ticks);
            }
            if let Some(interval_ms) = interval_ms {
                server_config.tick_interval_ms = interval_ms;
            }

            let configurations: Vec<Box<dyn GameConfiguration>> =
                vec![Box::new(demo::DemoConfiguration)];
            let mut server = Server::bootstrap(server_config, &configurations)?;
            server.run()?;

            println!(
                "finished: tick={} simulated_ms={}",
                server.context().tick(),
                server.context().time_tick()
            );
        }
        Commands::Info => {
            println!("simhost-cli v{}", env!("CARGO_PKG_VERSION"));
            let defaults = serde_yaml::to_string(&ServerConfig::default())?;
            println!("default config:\n{defaults}");
        }
    }

    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<ServerConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading server config {path}"))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing server config {path}"))
}
