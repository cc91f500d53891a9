//! Unified configuration for the bridge.
//!
//! Settings are read from `.bridge/bridge.toml` and layered as
//! file → environment → explicit overrides.
//!
//! # Configuration File Format
//!
//! ```toml
//! [bridge]
//! id_prefix = "portlet_1"
//! context_path = "/app"
//!
//! [scope]
//! transport = "auto"
//! url_threshold_bytes = 2048
//! preserve_action_params = false
//! post_redirect_get_support = false
//! evict_after_render = true
//! excluded_attributes = ["internal.*"]
//! retained_attributes = ["container.*"]
//!
//! [views]
//! mappings = ["/faces/*", "*.faces"]
//! default_suffix = ".xhtml"
//! known = ["/views/main.xhtml", "/views/edit.xhtml"]
//!
//! [views.defaults]
//! view = "/views/main.xhtml"
//! edit = "/views/edit.xhtml"
//!
//! [params.portlet]
//! "bridge.title" = "Orders"
//!
//! [params.application]
//! "bridge.title" = "Default"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File name of the bridge configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "bridge.toml";

/// Policy controlling how a request scope crosses a phase boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPolicy {
    /// Embed in a render parameter unless the scope is too large or holds
    /// non-string values (default)
    #[default]
    Auto,
    /// Always embed in a render parameter
    Url,
    /// Always store in the session
    Session,
}

impl std::fmt::Display for TransportPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportPolicy::Auto => write!(f, "auto"),
            TransportPolicy::Url => write!(f, "url"),
            TransportPolicy::Session => write!(f, "session"),
        }
    }
}

impl std::str::FromStr for TransportPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(TransportPolicy::Auto),
            "url" | "render_parameter" => Ok(TransportPolicy::Url),
            "session" | "session_attribute" => Ok(TransportPolicy::Session),
            _ => anyhow::bail!(
                "Invalid transport policy '{}'. Valid values: auto, url, session",
                s
            ),
        }
    }
}

/// Bridge instance settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeSection {
    /// Prefix for request scope ids, distinguishing bridge instances on one page
    #[serde(default)]
    pub id_prefix: Option<String>,
    /// Context path of the application; URLs outside it are external
    #[serde(default)]
    pub context_path: String,
}

/// Request scope propagation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeSection {
    /// Transport policy
    #[serde(default)]
    pub transport: TransportPolicy,
    /// Largest serialized scope (bytes) that may travel as a render parameter
    #[serde(default = "default_url_threshold_bytes")]
    pub url_threshold_bytes: usize,
    /// Preserve action parameters and view state into the render phase
    #[serde(default)]
    pub preserve_action_params: bool,
    /// Whether the container isolates action attributes from render requests
    #[serde(default)]
    pub post_redirect_get_support: bool,
    /// Evict session-backed scopes once the render phase consumed them
    #[serde(default = "default_evict_after_render")]
    pub evict_after_render: bool,
    /// Attribute name patterns that are never carried across phases
    #[serde(default)]
    pub excluded_attributes: Vec<String>,
    /// Attribute name patterns left untouched when a scope is restored
    #[serde(default)]
    pub retained_attributes: Vec<String>,
}

fn default_url_threshold_bytes() -> usize {
    2048
}

fn default_evict_after_render() -> bool {
    true
}

impl Default for ScopeSection {
    fn default() -> Self {
        Self {
            transport: TransportPolicy::default(),
            url_threshold_bytes: default_url_threshold_bytes(),
            preserve_action_params: false,
            post_redirect_get_support: false,
            evict_after_render: default_evict_after_render(),
            excluded_attributes: Vec::new(),
            retained_attributes: Vec::new(),
        }
    }
}

/// View configuration: default views per mode and path mappings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewsSection {
    /// Default view id keyed by portlet mode name
    #[serde(default)]
    pub defaults: HashMap<String, String>,
    /// Servlet-style mappings: prefix (`/faces/*`) or extension (`*.faces`)
    #[serde(default = "default_mappings")]
    pub mappings: Vec<String>,
    /// Suffix of view ids behind extension mappings
    #[serde(default = "default_suffix")]
    pub default_suffix: String,
    /// Views known to exist; empty disables the existence check
    #[serde(default)]
    pub known: Vec<String>,
}

fn default_mappings() -> Vec<String> {
    vec!["*.xhtml".to_string()]
}

fn default_suffix() -> String {
    ".xhtml".to_string()
}

impl Default for ViewsSection {
    fn default() -> Self {
        Self {
            defaults: HashMap::new(),
            mappings: default_mappings(),
            default_suffix: default_suffix(),
            known: Vec::new(),
        }
    }
}

/// Initialization parameters at portlet and application level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamsSection {
    #[serde(default)]
    pub portlet: HashMap<String, String>,
    #[serde(default)]
    pub application: HashMap<String, String>,
}

/// The complete bridge.toml configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeToml {
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub scope: ScopeSection,
    #[serde(default)]
    pub views: ViewsSection,
    #[serde(default)]
    pub params: ParamsSection,
}

impl BridgeToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse bridge.toml")
    }

    /// Load `bridge.toml` from a config directory, or defaults when absent.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize bridge.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let context_path = &self.bridge.context_path;
        if !context_path.is_empty()
            && (!context_path.starts_with('/') || context_path.ends_with('/'))
        {
            warnings.push(format!(
                "Invalid context_path '{}': should start with '/' and have no trailing '/'",
                context_path
            ));
        }

        if self.scope.url_threshold_bytes == 0 && self.scope.transport == TransportPolicy::Auto {
            warnings.push(
                "url_threshold_bytes = 0 sends every scope through the session".to_string(),
            );
        }

        for mapping in &self.views.mappings {
            if !is_valid_mapping(mapping) {
                warnings.push(format!(
                    "Invalid view mapping '{}': use '/prefix/*' or '*.ext'",
                    mapping
                ));
            }
        }

        for (mode, view_id) in &self.views.defaults {
            if !view_id.starts_with('/') {
                warnings.push(format!(
                    "Default view '{}' for mode '{}' should start with '/'",
                    view_id, mode
                ));
            }
        }

        if !self.views.default_suffix.starts_with('.') {
            warnings.push(format!(
                "Invalid default_suffix '{}': should start with '.'",
                self.views.default_suffix
            ));
        }

        warnings
    }
}

fn is_valid_mapping(mapping: &str) -> bool {
    if let Some(ext) = mapping.strip_prefix("*.") {
        return !ext.is_empty() && !ext.contains('/');
    }
    if let Some(prefix) = mapping.strip_suffix("/*") {
        return prefix.starts_with('/') && prefix.len() > 1;
    }
    false
}

/// Check if a glob-style pattern matches an attribute name.
///
/// Supports `*` (any sequence) and `?` (any single character). Matching is
/// case-sensitive since attribute names are.
pub fn pattern_matches(pattern: &str, name: &str) -> bool {
    glob_match(pattern.as_bytes(), name.as_bytes())
}

fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => (0..=text.len()).any(|i| glob_match(rest, &text[i..])),
        Some((b'?', rest)) => !text.is_empty() && glob_match(rest, &text[1..]),
        Some((c, rest)) => text.first() == Some(c) && glob_match(rest, &text[1..]),
    }
}

/// Runtime configuration combining `bridge.toml` with environment and
/// explicit overrides.
///
/// Precedence:
/// 1. explicit overrides (`with_overrides`)
/// 2. environment (`BRIDGE_ID_PREFIX`, `BRIDGE_SCOPE_TRANSPORT`, `BRIDGE_URL_THRESHOLD`)
/// 3. bridge.toml
/// 4. defaults
#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    /// Directory holding bridge.toml (None for in-memory configs)
    pub config_dir: Option<PathBuf>,
    /// Parsed bridge.toml
    pub toml: BridgeToml,
    /// Override: id prefix
    pub id_prefix_override: Option<String>,
    /// Override: URL threshold
    pub url_threshold_override: Option<usize>,
    /// Override: transport policy
    pub transport_override: Option<TransportPolicy>,
}

impl BridgeConfig {
    /// Load configuration from a config directory (e.g. `<project>/.bridge`).
    pub fn load(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        let toml = BridgeToml::load_or_default(&config_dir)?;
        Ok(Self {
            config_dir: Some(config_dir),
            toml,
            id_prefix_override: None,
            url_threshold_override: None,
            transport_override: None,
        })
    }

    /// Build a configuration from an already parsed file.
    pub fn from_toml(toml: BridgeToml) -> Self {
        Self {
            toml,
            ..Self::default()
        }
    }

    /// Apply explicit overrides.
    pub fn with_overrides(
        mut self,
        id_prefix: Option<String>,
        url_threshold_bytes: Option<usize>,
    ) -> Self {
        if id_prefix.is_some() {
            self.id_prefix_override = id_prefix;
        }
        if url_threshold_bytes.is_some() {
            self.url_threshold_override = url_threshold_bytes;
        }
        self
    }

    /// Pin the transport policy regardless of environment and file.
    pub fn with_transport(mut self, policy: TransportPolicy) -> Self {
        self.transport_override = Some(policy);
        self
    }

    /// Scope id prefix (override → env → file → empty).
    pub fn id_prefix(&self) -> String {
        self.id_prefix_override
            .clone()
            .or_else(|| std::env::var("BRIDGE_ID_PREFIX").ok())
            .or_else(|| self.toml.bridge.id_prefix.clone())
            .unwrap_or_default()
    }

    /// Transport policy (override → env → file).
    pub fn transport_policy(&self) -> TransportPolicy {
        if let Some(policy) = self.transport_override {
            return policy;
        }
        if let Ok(env_val) = std::env::var("BRIDGE_SCOPE_TRANSPORT") {
            match env_val.parse() {
                Ok(policy) => return policy,
                Err(e) => tracing::warn!(error = %e, "ignoring BRIDGE_SCOPE_TRANSPORT"),
            }
        }
        self.toml.scope.transport
    }

    /// URL embedding threshold in bytes (override → env → file).
    pub fn url_threshold_bytes(&self) -> usize {
        if let Some(threshold) = self.url_threshold_override {
            return threshold;
        }
        if let Ok(env_val) = std::env::var("BRIDGE_URL_THRESHOLD") {
            match env_val.parse() {
                Ok(threshold) => return threshold,
                Err(e) => tracing::warn!(error = %e, "ignoring BRIDGE_URL_THRESHOLD"),
            }
        }
        self.toml.scope.url_threshold_bytes
    }

    pub fn context_path(&self) -> &str {
        &self.toml.bridge.context_path
    }

    pub fn preserve_action_params(&self) -> bool {
        self.toml.scope.preserve_action_params
    }

    pub fn post_redirect_get_support(&self) -> bool {
        self.toml.scope.post_redirect_get_support
    }

    pub fn evict_after_render(&self) -> bool {
        self.toml.scope.evict_after_render
    }

    /// Whether an attribute name matches an exclusion pattern.
    pub fn is_excluded_attribute(&self, name: &str) -> bool {
        self.toml
            .scope
            .excluded_attributes
            .iter()
            .any(|pattern| pattern_matches(pattern, name))
    }

    /// Whether an attribute name is protected from removal on restore.
    pub fn is_retained_attribute(&self, name: &str) -> bool {
        self.toml
            .scope
            .retained_attributes
            .iter()
            .any(|pattern| pattern_matches(pattern, name))
    }

    /// Initialization parameter; portlet-level values override
    /// application-level values.
    pub fn init_param(&self, name: &str) -> Option<&str> {
        self.toml
            .params
            .portlet
            .get(name)
            .or_else(|| self.toml.params.application.get(name))
            .map(String::as_str)
    }

    /// Path to bridge.toml, if backed by a directory.
    pub fn config_file(&self) -> Option<PathBuf> {
        self.config_dir.as_ref().map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
