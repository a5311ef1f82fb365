use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use astrolino::config::Config;
use astrolino::{app, logging};

#[derive(Parser)]
#[command(name = "astrolino")]
#[command(version)]
#[command(about = "Terminal chat client for the Astrolino chat service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Chat server URL (overrides server.url)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Seconds to wait for a reply; 0 waits forever (overrides ui.reply_timeout_secs)
    #[arg(long, global = true)]
    reply_timeout: Option<u64>,

    /// Log file path (default ~/.astrolino/astrolino.log)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (default ~/.astrolino/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat screen (default)
    Chat,
    /// Inspect or create the configuration file
    Config {
        /// Write the default configuration if none exists
        #[arg(long)]
        init: bool,
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    match cli.command {
        Some(Commands::Config { init, show }) => run_config(&cli, &config_path, init, show),
        None | Some(Commands::Chat) => {
            let config = effective_config(&cli, &config_path)?;
            let log_file = match &cli.log_file {
                Some(path) => path.clone(),
                None => Config::home_dir()?.join("astrolino.log"),
            };
            logging::init(&log_file, cli.verbose)?;
            tracing::info!(server = %config.server.url, "starting astrolino");

            app::run(config).await
        }
    }
}

fn effective_config(cli: &Cli, path: &Path) -> Result<Config> {
    let mut config = Config::load_from(path)?;
    if let Some(server) = &cli.server {
        config.server.url = server.clone();
    }
    if let Some(timeout) = cli.reply_timeout {
        config.ui.reply_timeout_secs = timeout;
    }
    config.validate()?;
    Ok(config)
}

fn run_config(cli: &Cli, path: &Path, init: bool, show: bool) -> Result<()> {
    if init {
        if path.exists() {
            println!("⚙️  Config already exists at {}", path.display());
        } else {
            Config::default()
                .save_to(path)
                .with_context(|| format!("Failed to initialize {}", path.display()))?;
            println!("✅ Wrote default config to {}", path.display());
        }
    }

    if show || !init {
        let config = effective_config(cli, path)?;
        println!("# {}", path.display());
        print!("{}", config.to_toml()?);
    }

    Ok(())
}
