//! Lifecycle phase and portlet mode value types.
//!
//! This module provides:
//! - `PhaseKind`, the four discrete request phases of the portlet lifecycle
//! - `PortletMode`, the display mode a portlet is rendered in

use serde::{Deserialize, Serialize};

/// One discrete step of the multi-phase lifecycle.
///
/// Each phase is delivered to the bridge as an independent request/response
/// pair. Action and Event phases may mutate state; Render and Resource phases
/// consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    /// Form submission / state-changing request
    Action,
    /// Inter-portlet event delivery
    Event,
    /// Markup generation
    #[default]
    Render,
    /// Resource serving (images, partial responses)
    Resource,
}

impl PhaseKind {
    /// Returns all phases in lifecycle order.
    pub fn all() -> &'static [PhaseKind] {
        &[
            PhaseKind::Action,
            PhaseKind::Event,
            PhaseKind::Render,
            PhaseKind::Resource,
        ]
    }

    /// Returns the wire token used in `portlet:` URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Action => "action",
            PhaseKind::Event => "event",
            PhaseKind::Render => "render",
            PhaseKind::Resource => "resource",
        }
    }

    /// Whether request scope state is saved at the end of this phase.
    pub fn saves_state(&self) -> bool {
        matches!(self, PhaseKind::Action | PhaseKind::Event)
    }

    /// Whether request scope state is restored at the start of this phase.
    pub fn restores_state(&self) -> bool {
        matches!(self, PhaseKind::Event | PhaseKind::Render)
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PhaseKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "action" | "action_phase" => Ok(PhaseKind::Action),
            "event" | "event_phase" => Ok(PhaseKind::Event),
            "render" | "render_phase" => Ok(PhaseKind::Render),
            "resource" | "resource_phase" => Ok(PhaseKind::Resource),
            _ => anyhow::bail!(
                "Invalid phase '{}'. Valid values: action, event, render, resource",
                s
            ),
        }
    }
}

/// Display mode of a portlet.
///
/// The three standard modes have dedicated variants; portals may define
/// their own, which are kept verbatim (lowercased) in `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PortletMode {
    #[default]
    View,
    Edit,
    Help,
    Custom(String),
}

impl PortletMode {
    pub fn as_str(&self) -> &str {
        match self {
            PortletMode::View => "view",
            PortletMode::Edit => "edit",
            PortletMode::Help => "help",
            PortletMode::Custom(name) => name,
        }
    }
}

impl From<String> for PortletMode {
    fn from(value: String) -> Self {
        PortletMode::from(value.as_str())
    }
}

impl From<&str> for PortletMode {
    fn from(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "view" => PortletMode::View,
            "edit" => PortletMode::Edit,
            "help" => PortletMode::Help,
            other => PortletMode::Custom(other.to_string()),
        }
    }
}

impl From<PortletMode> for String {
    fn from(mode: PortletMode) -> Self {
        mode.as_str().to_string()
    }
}

impl std::fmt::Display for PortletMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_kind_display() {
        assert_eq!(PhaseKind::Action.to_string(), "action");
        assert_eq!(PhaseKind::Event.to_string(), "event");
        assert_eq!(PhaseKind::Render.to_string(), "render");
        assert_eq!(PhaseKind::Resource.to_string(), "resource");
    }

    #[test]
    fn test_phase_kind_from_str() {
        assert_eq!("ACTION".parse::<PhaseKind>().unwrap(), PhaseKind::Action);
        assert_eq!(
            "render_phase".parse::<PhaseKind>().unwrap(),
            PhaseKind::Render
        );
        for phase in PhaseKind::all() {
            assert_eq!(phase.as_str().parse::<PhaseKind>().unwrap(), *phase);
        }
    }

    #[test]
    fn test_phase_kind_from_str_invalid() {
        let result = "commit".parse::<PhaseKind>();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid phase"));
    }

    #[test]
    fn test_save_and_restore_phases() {
        assert!(PhaseKind::Action.saves_state());
        assert!(PhaseKind::Event.saves_state());
        assert!(!PhaseKind::Render.saves_state());
        assert!(!PhaseKind::Resource.saves_state());

        assert!(PhaseKind::Event.restores_state());
        assert!(PhaseKind::Render.restores_state());
        assert!(!PhaseKind::Action.restores_state());
        assert!(!PhaseKind::Resource.restores_state());
    }

    #[test]
    fn test_portlet_mode_parsing() {
        assert_eq!(PortletMode::from("VIEW"), PortletMode::View);
        assert_eq!(PortletMode::from("edit"), PortletMode::Edit);
        assert_eq!(PortletMode::from("help"), PortletMode::Help);
        assert_eq!(
            PortletMode::from("config"),
            PortletMode::Custom("config".to_string())
        );
        assert_eq!(PortletMode::default(), PortletMode::View);
    }

    #[test]
    fn test_portlet_mode_serde_as_string() {
        let json = serde_json::to_string(&PortletMode::Edit).unwrap();
        assert_eq!(json, "\"edit\"");
        let mode: PortletMode = serde_json::from_str("\"print\"").unwrap();
        assert_eq!(mode, PortletMode::Custom("print".to_string()));
    }
}
