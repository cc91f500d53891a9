//! Transport selection and the propagation token.
//!
//! A scope crosses the phase boundary either embedded in render parameters
//! (`_bridgeScope` with the id, `_bridgeScopeState` with the serialized
//! scope) or stored in the session with only the id in `_bridgeScope`.

use super::{RequestScope, Transport};
use crate::config::{BridgeConfig, TransportPolicy};
use crate::url::ParameterMap;

/// Render parameter carrying the scope id.
pub const SCOPE_ID_PARAM: &str = "_bridgeScope";

/// Render parameter carrying the embedded scope payload.
pub const SCOPE_STATE_PARAM: &str = "_bridgeScopeState";

/// Decides which transport a scope uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSelector {
    policy: TransportPolicy,
    url_threshold_bytes: usize,
}

impl TransportSelector {
    pub fn new(policy: TransportPolicy, url_threshold_bytes: usize) -> Self {
        Self {
            policy,
            url_threshold_bytes,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.transport_policy(), config.url_threshold_bytes())
    }

    /// Pick the transport for a scope whose serialized form is
    /// `serialized_len` bytes long.
    pub fn select(&self, scope: &RequestScope, serialized_len: usize) -> Transport {
        match self.policy {
            TransportPolicy::Url => Transport::UrlParameter,
            TransportPolicy::Session => Transport::SessionAttribute,
            TransportPolicy::Auto => {
                if serialized_len > self.url_threshold_bytes || !scope.is_url_embeddable() {
                    Transport::SessionAttribute
                } else {
                    Transport::UrlParameter
                }
            }
        }
    }
}

/// Identity of a scope as carried in render parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeToken {
    /// Only the id; the scope lives in the session
    Reference { id: String },
    /// The id plus the serialized scope
    Embedded { id: String, payload: String },
}

impl ScopeToken {
    pub fn id(&self) -> &str {
        match self {
            ScopeToken::Reference { id } | ScopeToken::Embedded { id, .. } => id,
        }
    }

    /// Render parameters for this token.
    pub fn to_parameters(&self) -> Vec<(&'static str, String)> {
        match self {
            ScopeToken::Reference { id } => vec![(SCOPE_ID_PARAM, id.clone())],
            ScopeToken::Embedded { id, payload } => vec![
                (SCOPE_ID_PARAM, id.clone()),
                (SCOPE_STATE_PARAM, payload.clone()),
            ],
        }
    }

    /// Read a token from request parameters. The embedded payload wins
    /// whenever present.
    pub fn from_parameters(params: &ParameterMap) -> Option<Self> {
        let id = params.first(SCOPE_ID_PARAM).filter(|id| !id.is_empty())?;
        match params.first(SCOPE_STATE_PARAM).filter(|p| !p.is_empty()) {
            Some(payload) => Some(ScopeToken::Embedded {
                id: id.to_string(),
                payload: payload.to_string(),
            }),
            None => Some(ScopeToken::Reference { id: id.to_string() }),
        }
    }

    /// Whether a parameter name belongs to the propagation token.
    pub fn is_token_parameter(name: &str) -> bool {
        name == SCOPE_ID_PARAM || name == SCOPE_STATE_PARAM
    }
}
