use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "phase-bridge")]
#[command(version, about = "Inspect URL encoding and request scope propagation of the phase bridge")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Scope id prefix. Overrides bridge.toml and BRIDGE_ID_PREFIX.
    #[arg(long, global = true)]
    pub id_prefix: Option<String>,

    /// Largest scope (bytes) sent as a render parameter. Overrides bridge.toml and BRIDGE_URL_THRESHOLD.
    #[arg(long, global = true)]
    pub url_threshold: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a URL and print its structural facts as JSON
    Classify {
        url: String,

        /// Context path used for the externality test (defaults to bridge.toml)
        #[arg(long)]
        context_path: Option<String>,
    },
    /// Encode a URL as a view would request it
    Encode {
        /// URL kind: action, bookmarkable, partial_action, redirect, resource
        kind: String,

        url: String,

        /// Extra parameter as NAME=VALUE (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Context path (defaults to bridge.toml)
        #[arg(long)]
        context_path: Option<String>,

        /// Encode as if a URL-transported request scope were active
        #[arg(long)]
        with_scope: bool,
    },
    /// Run an Action phase followed by the Render phase it leads to
    Simulate {
        /// Attribute set during the action as NAME=VALUE (repeatable).
        /// Values that parse as JSON are stored as JSON.
        #[arg(short, long = "attr")]
        attrs: Vec<String>,

        /// Portlet mode to switch to during the action
        #[arg(long)]
        mode: Option<String>,

        /// Redirect target issued by the action
        #[arg(long)]
        redirect: Option<String>,

        /// Transport policy: auto, url, session
        #[arg(long)]
        transport: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default bridge.toml file
    Init,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "phase_bridge=debug"
    } else {
        "phase_bridge=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Classify { url, context_path } => {
            let config = cmd::load_config(&project_dir, &cli)?;
            cmd::cmd_classify(&config, url, context_path.as_deref())?
        }
        Commands::Encode {
            kind,
            url,
            params,
            context_path,
            with_scope,
        } => {
            let config = cmd::load_config(&project_dir, &cli)?;
            cmd::cmd_encode(
                &config,
                kind,
                url,
                params,
                context_path.as_deref(),
                *with_scope,
            )?
        }
        Commands::Simulate {
            attrs,
            mode,
            redirect,
            transport,
            json,
        } => {
            let config = cmd::load_config(&project_dir, &cli)?;
            cmd::cmd_simulate(
                config,
                attrs,
                mode.as_deref(),
                redirect.as_deref(),
                transport.as_deref(),
                *json,
            )?
        }
        Commands::Config { command } => cmd::cmd_config(&project_dir, &cli, command.clone())?,
    }

    Ok(())
}
