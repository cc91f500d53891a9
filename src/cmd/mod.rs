//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module      | Commands handled |
//! |-------------|------------------|
//! | `classify`  | `Classify`       |
//! | `encode`    | `Encode`         |
//! | `simulate`  | `Simulate`       |
//! | `config`    | `Config`         |

pub mod classify;
pub mod config;
pub mod encode;
pub mod simulate;

pub use classify::cmd_classify;
pub use config::cmd_config;
pub use encode::cmd_encode;
pub use simulate::cmd_simulate;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use phase_bridge::config::BridgeConfig;

use crate::Cli;

/// Directory holding bridge.toml inside a project.
pub fn bridge_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(".bridge")
}

/// Load bridge.toml from the project and apply CLI overrides.
pub fn load_config(project_dir: &Path, cli: &Cli) -> Result<BridgeConfig> {
    let config = BridgeConfig::load(bridge_dir(project_dir))
        .with_context(|| format!("Failed to load configuration for {}", project_dir.display()))?;
    Ok(config.with_overrides(cli.id_prefix.clone(), cli.url_threshold))
}

/// Split `NAME=VALUE` arguments.
pub fn parse_assignments(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|item| {
            item.split_once('=')
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .with_context(|| format!("Invalid argument '{}': expected NAME=VALUE", item))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignments() {
        let parsed = parse_assignments(&["a=1".to_string(), "b=x=y".to_string()]).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "x=y".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_assignments_rejects_bare_names() {
        let err = parse_assignments(&["flag".to_string()]).unwrap_err();
        assert!(err.to_string().contains("expected NAME=VALUE"));
        assert!(parse_assignments(&["=v".to_string()]).is_err());
    }
}
