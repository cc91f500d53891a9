//! Request scope: state that must survive from an Action/Event phase into a
//! later Event/Render phase that arrives as a different request.
//!
//! - `RequestScope`: the preserved attributes plus lifecycle metadata
//! - `SessionStore`: session-backed storage for scopes too large or too rich
//!   to travel in a URL
//! - `TransportSelector` / `ScopeToken`: how a scope crosses the boundary
//! - `ScopeManager`: the save / restore / exclusion operations

mod manager;
mod session;
mod transport;

pub use manager::{ScopeManager, VIEW_STATE_PARAM};
pub use session::{MemorySessionStore, SCOPE_SESSION_PREFIX, SessionStore, scope_session_key};
pub use transport::{SCOPE_ID_PARAM, SCOPE_STATE_PARAM, ScopeToken, TransportSelector};

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::{PhaseKind, PortletMode};

/// Ordered request attributes.
pub type AttributeMap = IndexMap<String, serde_json::Value>;

/// How a scope's identity crosses a phase boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Carried as a render parameter
    #[default]
    UrlParameter,
    /// Stored in the portlet session, referenced by id
    SessionAttribute,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::UrlParameter => write!(f, "url_parameter"),
            Transport::SessionAttribute => write!(f, "session_attribute"),
        }
    }
}

/// Attribute set and metadata preserved across one user interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestScope {
    id: String,
    began_in_phase: PhaseKind,
    date_created: DateTime<Utc>,
    #[serde(default)]
    attributes: AttributeMap,
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    removed_attribute_names: IndexSet<String>,
    #[serde(default)]
    faces_lifecycle_executed: bool,
    #[serde(default)]
    navigation_occurred: bool,
    #[serde(default)]
    redirect_occurred: bool,
    #[serde(default)]
    portlet_mode_changed: bool,
    #[serde(default)]
    portlet_mode: PortletMode,
    #[serde(default)]
    transport: Transport,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    preserved_action_parameter_map: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preserved_view_state_param: Option<String>,
    /// Whether a copy currently lives in the session store.
    #[serde(skip)]
    persisted: bool,
}

impl RequestScope {
    /// Allocate a scope for the given phase. The id carries `id_prefix` so
    /// that several bridge instances on one page never collide.
    pub fn new(id_prefix: &str, phase: PhaseKind, mode: PortletMode) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        let id = if id_prefix.is_empty() {
            suffix
        } else {
            format!("{id_prefix}:{suffix}")
        };

        Self {
            id,
            began_in_phase: phase,
            date_created: Utc::now(),
            attributes: AttributeMap::new(),
            removed_attribute_names: IndexSet::new(),
            faces_lifecycle_executed: false,
            navigation_occurred: false,
            redirect_occurred: false,
            portlet_mode_changed: false,
            portlet_mode: mode,
            transport: Transport::UrlParameter,
            preserved_action_parameter_map: IndexMap::new(),
            preserved_view_state_param: None,
            persisted: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn began_in_phase(&self) -> PhaseKind {
        self.began_in_phase
    }

    pub fn date_created(&self) -> DateTime<Utc> {
        self.date_created
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<serde_json::Value> {
        self.attributes.shift_remove(name)
    }

    /// Names stripped from the live request during restore or exclusion.
    pub fn removed_attribute_names(&self) -> &IndexSet<String> {
        &self.removed_attribute_names
    }

    pub fn is_faces_lifecycle_executed(&self) -> bool {
        self.faces_lifecycle_executed
    }

    pub fn set_faces_lifecycle_executed(&mut self, executed: bool) {
        self.faces_lifecycle_executed = executed;
    }

    pub fn is_navigation_occurred(&self) -> bool {
        self.navigation_occurred
    }

    pub fn set_navigation_occurred(&mut self, occurred: bool) {
        self.navigation_occurred = occurred;
    }

    pub fn is_redirect_occurred(&self) -> bool {
        self.redirect_occurred
    }

    pub fn set_redirect_occurred(&mut self, occurred: bool) {
        self.redirect_occurred = occurred;
    }

    /// When true, attributes are not preserved by the next save.
    pub fn is_portlet_mode_changed(&self) -> bool {
        self.portlet_mode_changed
    }

    pub fn set_portlet_mode_changed(&mut self, changed: bool) {
        self.portlet_mode_changed = changed;
    }

    pub fn portlet_mode(&self) -> &PortletMode {
        &self.portlet_mode
    }

    pub fn set_portlet_mode(&mut self, mode: PortletMode) {
        self.portlet_mode = mode;
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn preserved_action_parameter_map(&self) -> &IndexMap<String, String> {
        &self.preserved_action_parameter_map
    }

    pub fn preserved_view_state_param(&self) -> Option<&str> {
        self.preserved_view_state_param.as_deref()
    }

    /// Whether every attribute value can travel as URL text.
    pub fn is_url_embeddable(&self) -> bool {
        self.attributes.values().all(serde_json::Value::is_string)
    }
}
