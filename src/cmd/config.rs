//! Configuration view and validation commands (`phase-bridge config`).

use anyhow::Result;

use phase_bridge::config::{BridgeConfig, BridgeToml, CONFIG_FILE_NAME};

use super::super::{Cli, ConfigCommands};
use super::{bridge_dir, load_config};

pub fn cmd_config(
    project_dir: &std::path::Path,
    cli: &Cli,
    command: Option<ConfigCommands>,
) -> Result<()> {
    let config_dir = bridge_dir(project_dir);
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Bridge Configuration");
            println!("====================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                BridgeToml::load(&config_path)?
            } else {
                println!("No bridge.toml found at {}", config_path.display());
                println!("Using default configuration.");
                BridgeToml::default()
            };
            println!();
            print_toml(&toml);

            println!("Effective values (with env/CLI overrides):");
            let config: BridgeConfig = load_config(project_dir, cli)?;
            println!("  id_prefix = \"{}\"", config.id_prefix());
            println!("  transport = \"{}\"", config.transport_policy());
            println!("  url_threshold_bytes = {}", config.url_threshold_bytes());
            println!();

            if !config_path.exists() {
                println!("Run 'phase-bridge config init' to create a bridge.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No bridge.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = BridgeToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("bridge.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config_dir.exists() {
                std::fs::create_dir_all(&config_dir)?;
            }

            BridgeToml::default().save(&config_path)?;

            println!("Created bridge.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [bridge] id_prefix, context_path");
            println!("  - [scope] transport, url_threshold_bytes, excluded_attributes");
            println!("  - [views] mappings, defaults per portlet mode");
            println!();
        }
    }

    Ok(())
}

fn print_toml(toml: &BridgeToml) {
    println!("[bridge]");
    if let Some(prefix) = &toml.bridge.id_prefix {
        println!("  id_prefix = \"{}\"", prefix);
    }
    println!("  context_path = \"{}\"", toml.bridge.context_path);
    println!();

    println!("[scope]");
    println!("  transport = \"{}\"", toml.scope.transport);
    println!("  url_threshold_bytes = {}", toml.scope.url_threshold_bytes);
    println!("  preserve_action_params = {}", toml.scope.preserve_action_params);
    println!(
        "  post_redirect_get_support = {}",
        toml.scope.post_redirect_get_support
    );
    println!("  evict_after_render = {}", toml.scope.evict_after_render);
    if !toml.scope.excluded_attributes.is_empty() {
        println!(
            "  excluded_attributes = {:?}",
            toml.scope.excluded_attributes
        );
    }
    if !toml.scope.retained_attributes.is_empty() {
        println!(
            "  retained_attributes = {:?}",
            toml.scope.retained_attributes
        );
    }
    println!();

    println!("[views]");
    println!("  mappings = {:?}", toml.views.mappings);
    println!("  default_suffix = \"{}\"", toml.views.default_suffix);
    let mut defaults: Vec<_> = toml.views.defaults.iter().collect();
    defaults.sort();
    for (mode, view_id) in defaults {
        println!("  defaults.{} = \"{}\"", mode, view_id);
    }
    println!();
}
