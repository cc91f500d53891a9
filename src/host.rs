//! Request and response carriers exchanged with the hosting container.
//!
//! The host builds a `PhaseRequest` for every phase request it receives and
//! applies the resulting `PhaseResponse` (render parameters, redirect,
//! dispatched view, buffered output) to its own response object.

use indexmap::IndexMap;

use crate::phase::{PhaseKind, PortletMode};
use crate::scope::AttributeMap;
use crate::url::ParameterMap;

/// One phase request as seen by the bridge.
#[derive(Debug, Clone, Default)]
pub struct PhaseRequest {
    pub phase: PhaseKind,
    /// Request parameters, including render parameters set by the previous phase
    pub parameters: ParameterMap,
    pub headers: IndexMap<String, String>,
    /// Live request attributes
    pub attributes: AttributeMap,
    pub portlet_mode: PortletMode,
    /// Context path of the application; empty means "use the configured one"
    pub context_path: String,
    /// Portlet namespace prefixed to client ids and element names
    pub namespace: String,
}

impl PhaseRequest {
    pub fn new(phase: PhaseKind) -> Self {
        Self {
            phase,
            ..Self::default()
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.append(name, value);
        self
    }

    pub fn with_parameters(mut self, parameters: &ParameterMap) -> Self {
        self.parameters.merge(parameters);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_portlet_mode(mut self, mode: PortletMode) -> Self {
        self.portlet_mode = mode;
        self
    }

    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
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

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// What the bridge hands back to the host for one phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseResponse {
    /// Parameters the next phase request will receive
    pub render_parameters: ParameterMap,
    /// Redirect target (Action/Event only)
    pub redirect: Option<String>,
    /// View dispatched to during Render/Resource
    pub dispatched_view: Option<String>,
    /// Requested portlet mode for the next phase
    pub portlet_mode: Option<PortletMode>,
    /// Buffered markup or resource output
    pub output: String,
}

impl PhaseResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the render parameter with a single value.
    pub fn set_render_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.render_parameters.set(name, vec![value.into()]);
    }

    pub fn remove_render_parameter(&mut self, name: &str) -> Option<Vec<String>> {
        self.render_parameters.remove(name)
    }

    pub fn send_redirect(&mut self, location: impl Into<String>) {
        self.redirect = Some(location.into());
    }

    pub fn dispatch(&mut self, view_id: impl Into<String>) {
        self.dispatched_view = Some(view_id.into());
    }

    pub fn set_portlet_mode(&mut self, mode: PortletMode) {
        self.portlet_mode = Some(mode);
    }
}

impl std::fmt::Write for PhaseResponse {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}
