//! View configuration provider.
//!
//! Supplies the default view for each portlet mode and maps request paths
//! to view ids using servlet-style mappings:
//! - prefix mappings (`/faces/*`): the path below the prefix is the view id
//! - extension mappings (`*.faces`): the extension is swapped for the
//!   configured view suffix

use std::collections::{HashMap, HashSet};

use crate::config::ViewsSection;
use crate::phase::PortletMode;

/// Resolves view ids for the coordinator and the URL encoder.
pub trait ViewResolver: Send + Sync {
    /// Default view id for a portlet mode, if configured.
    fn default_view_id(&self, mode: &PortletMode) -> Option<String>;

    /// View id for a context-relative path. With `must_exist`, only views
    /// known to exist are returned.
    fn view_id_from_path(&self, path: &str, must_exist: bool) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mapping {
    Prefix(String),
    Extension(String),
}

impl Mapping {
    fn parse(raw: &str) -> Option<Self> {
        if let Some(ext) = raw.strip_prefix("*.") {
            return Some(Mapping::Extension(format!(".{ext}")));
        }
        raw.strip_suffix("/*")
            .filter(|prefix| prefix.starts_with('/'))
            .map(|prefix| Mapping::Prefix(prefix.to_string()))
    }
}

/// `ViewResolver` driven by the `[views]` configuration section.
#[derive(Debug, Clone)]
pub struct MappedViewResolver {
    defaults: HashMap<String, String>,
    mappings: Vec<Mapping>,
    default_suffix: String,
    known: HashSet<String>,
}

impl MappedViewResolver {
    pub fn new(section: &ViewsSection) -> Self {
        let mappings = section
            .mappings
            .iter()
            .filter_map(|raw| {
                let mapping = Mapping::parse(raw);
                if mapping.is_none() {
                    tracing::warn!(mapping = %raw, "ignoring invalid view mapping");
                }
                mapping
            })
            .collect();

        Self {
            defaults: section.defaults.clone(),
            mappings,
            default_suffix: section.default_suffix.clone(),
            known: section.known.iter().cloned().collect(),
        }
    }

    fn map_path(&self, path: &str) -> Option<String> {
        self.mappings.iter().find_map(|mapping| match mapping {
            Mapping::Prefix(prefix) => path
                .strip_prefix(prefix.as_str())
                .filter(|rest| rest.starts_with('/') && rest.len() > 1)
                .map(str::to_string),
            Mapping::Extension(ext) => path.strip_suffix(ext.as_str()).and_then(|stem| {
                if stem.is_empty() || stem.ends_with('/') {
                    None
                } else {
                    Some(format!("{stem}{}", self.default_suffix))
                }
            }),
        })
    }

    fn exists(&self, view_id: &str) -> bool {
        self.known.is_empty() || self.known.contains(view_id)
    }
}

impl ViewResolver for MappedViewResolver {
    fn default_view_id(&self, mode: &PortletMode) -> Option<String> {
        self.defaults.get(mode.as_str()).cloned()
    }

    fn view_id_from_path(&self, path: &str, must_exist: bool) -> Option<String> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let view_id = self.map_path(path)?;
        if must_exist && !self.exists(&view_id) {
            tracing::debug!(path, view_id = %view_id, "mapped view does not exist");
            return None;
        }
        Some(view_id)
    }
}
