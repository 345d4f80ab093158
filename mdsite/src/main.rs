use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use mdsite::{serve, watch, Config, Site};
use std::{fs::create_dir_all, net::SocketAddr, path::PathBuf};

/// Converts Markdown documents listed in a manifest into HTML pages.
#[derive(Parser)]
#[command(name = "mdsite", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the JSON manifest (overrides the configuration file)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Output directory (overrides the configuration file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log debugging information
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every page in the manifest once
    Build,
    /// Convert every page, then serve the output and re-convert whenever a source changes
    Serve {
        /// Port to listen on (overrides the configuration file)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(if cli.verbose {
        "debug"
    } else {
        "info"
    }))
    .init();

    // Read configuration
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    if let Some(manifest) = cli.manifest {
        config.manifest = manifest.into();
    }
    if let Some(output) = cli.output {
        config.output_dir = output.into();
    }
    config.check_paths().context("configuration is invalid")?;

    let site = Site::from_config(&config)?;

    match cli.command {
        Command::Build => {
            let count = site.convert_all().context("failed to convert pages")?;
            info!("converted all {count} files");
        }
        Command::Serve { port } => {
            let addr = SocketAddr::new(config.serve.interface, port.unwrap_or(config.serve.port));
            let root = site.output_dir().to_path_buf();
            create_dir_all(&root).context("failed to create output directory")?;

            let _watcher = watch::spawn(site)?;

            serve::run(&root, addr)?;
        }
    }

    Ok(())
}
