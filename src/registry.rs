//! Explicit registry of the pluggable pieces a coordinator needs.
//!
//! The host assembles a `BridgeRegistry` once at start-up. Every getter
//! fails with `BridgeError::FactoryNotFound` when the piece was never
//! registered, so a misconfigured host is caught on the first request
//! instead of producing half-initialized state.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::config::BridgeConfig;
use crate::errors::BridgeError;
use crate::view::{MappedViewResolver, ViewResolver};

/// Factory name reported when no configuration is registered.
pub const CONFIG_FACTORY: &str = "bridge_config";

/// Factory name reported when no view resolver is registered.
pub const VIEW_RESOLVER_FACTORY: &str = "view_resolver";

#[derive(Default, Clone)]
pub struct BridgeRegistry {
    config: Option<Arc<BridgeConfig>>,
    views: Option<Arc<dyn ViewResolver>>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the configuration and the mapping-based view resolver
    /// built from its `[views]` section.
    pub fn from_config(config: BridgeConfig) -> Self {
        let views = MappedViewResolver::new(&config.toml.views);
        Self::new().with_config(config).with_view_resolver(views)
    }

    /// Load `bridge.toml` from a config directory and register defaults.
    pub fn load(config_dir: impl AsRef<Path>) -> Result<Self> {
        let config = BridgeConfig::load(config_dir.as_ref())?;
        Ok(Self::from_config(config))
    }

    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    pub fn with_view_resolver(mut self, views: impl ViewResolver + 'static) -> Self {
        self.views = Some(Arc::new(views));
        self
    }

    pub fn config(&self) -> Result<Arc<BridgeConfig>, BridgeError> {
        self.config.clone().ok_or(BridgeError::FactoryNotFound {
            factory: CONFIG_FACTORY,
        })
    }

    pub fn view_resolver(&self) -> Result<Arc<dyn ViewResolver>, BridgeError> {
        self.views.clone().ok_or(BridgeError::FactoryNotFound {
            factory: VIEW_RESOLVER_FACTORY,
        })
    }
}
