//! Lifecycle operations on request scopes: create, save at the end of an
//! Action/Event phase, restore at the start of an Event/Render phase,
//! strip excluded attributes, and evict once consumed.

use std::collections::HashSet;

use super::session::{SessionStore, scope_session_key};
use super::transport::{SCOPE_STATE_PARAM, ScopeToken, TransportSelector};
use super::{RequestScope, Transport};
use crate::config::BridgeConfig;
use crate::errors::BridgeError;
use crate::host::{PhaseRequest, PhaseResponse};
use crate::phase::{PhaseKind, PortletMode};

/// Request parameter carrying the saved view state.
pub const VIEW_STATE_PARAM: &str = "_bridgeViewState";

/// Save/restore engine bound to one configuration and one session.
pub struct ScopeManager<'a> {
    config: &'a BridgeConfig,
    session: &'a dyn SessionStore,
}

impl<'a> ScopeManager<'a> {
    pub fn new(config: &'a BridgeConfig, session: &'a dyn SessionStore) -> Self {
        Self { config, session }
    }

    /// Allocate a new scope. Transport starts as `UrlParameter`.
    pub fn create(&self, phase: PhaseKind, mode: PortletMode) -> RequestScope {
        let scope = RequestScope::new(&self.config.id_prefix(), phase, mode);
        tracing::debug!(scope_id = %scope.id(), phase = %phase, "created request scope");
        scope
    }

    /// Persist the scope at the end of an Action or Event phase.
    ///
    /// `pre_existing` holds the attribute names present on the request
    /// before the scope was created; they are never carried over unless the
    /// scope already holds them. Scope attributes missing from the request
    /// are dropped. On error
    /// neither the scope nor the response is touched.
    pub fn save_state(
        &self,
        scope: &mut RequestScope,
        request: &PhaseRequest,
        pre_existing: &HashSet<String>,
        response: &mut PhaseResponse,
    ) -> Result<(), BridgeError> {
        let mut next = scope.clone();

        if next.portlet_mode_changed {
            next.attributes.clear();
            next.preserved_action_parameter_map.clear();
            next.preserved_view_state_param = None;
            tracing::debug!(scope_id = %next.id, "portlet mode changed, attributes not preserved");
        } else {
            for (name, value) in &request.attributes {
                if self.config.is_excluded_attribute(name) {
                    continue;
                }
                if pre_existing.contains(name) && !next.attributes.contains_key(name) {
                    continue;
                }
                next.attributes.insert(name.clone(), value.clone());
            }
            // Scope attributes mirror the live request; a name gone from it
            // was removed during this phase.
            next.attributes.retain(|name, _| {
                request.attributes.contains_key(name) && !self.config.is_excluded_attribute(name)
            });

            if self.config.preserve_action_params() {
                self.preserve_parameters(&mut next, request);
            }
        }

        let measured = serde_json::to_string(&next).map_err(BridgeError::ScopeEncoding)?;
        let transport = TransportSelector::from_config(self.config).select(&next, measured.len());
        next.transport = transport;
        let payload = serde_json::to_string(&next).map_err(BridgeError::ScopeEncoding)?;

        let key = scope_session_key(&next.id);
        let token = match transport {
            Transport::SessionAttribute => {
                if next.persisted {
                    self.session.put(&key, payload.into_bytes())?;
                } else if !self.session.put_if_absent(&key, payload.clone().into_bytes())? {
                    tracing::warn!(scope_id = %next.id, "scope already in session, overwriting");
                    self.session.put(&key, payload.into_bytes())?;
                }
                next.persisted = true;
                ScopeToken::Reference { id: next.id.clone() }
            }
            Transport::UrlParameter => {
                if next.persisted {
                    self.session.remove(&key)?;
                    next.persisted = false;
                }
                ScopeToken::Embedded {
                    id: next.id.clone(),
                    payload,
                }
            }
        };

        response.remove_render_parameter(SCOPE_STATE_PARAM);
        for (name, value) in token.to_parameters() {
            response.set_render_parameter(name, value);
        }

        tracing::info!(
            scope_id = %next.id,
            transport = %transport,
            attributes = next.attributes.len(),
            bytes = measured.len(),
            "saved request scope"
        );
        *scope = next;
        Ok(())
    }

    fn preserve_parameters(&self, scope: &mut RequestScope, request: &PhaseRequest) {
        scope.preserved_action_parameter_map = request
            .parameters
            .iter()
            .filter(|(name, _)| {
                !ScopeToken::is_token_parameter(name) && name.as_str() != VIEW_STATE_PARAM
            })
            .filter_map(|(name, values)| values.first().map(|v| (name.clone(), v.clone())))
            .collect();
        scope.preserved_view_state_param = request
            .parameters
            .first(VIEW_STATE_PARAM)
            .map(str::to_string);
    }

    /// Locate the scope named by the request's render parameters and
    /// repopulate the request from it.
    ///
    /// Returns `Ok(None)` when the request carries no scope (a fresh start)
    /// or when the scope can no longer be found.
    pub fn restore_state(
        &self,
        request: &mut PhaseRequest,
    ) -> Result<Option<RequestScope>, BridgeError> {
        let Some(token) = ScopeToken::from_parameters(&request.parameters) else {
            tracing::debug!(phase = %request.phase, "no request scope to restore");
            return Ok(None);
        };

        let located = match &token {
            ScopeToken::Embedded { id, payload } => {
                match decode_scope(payload.as_bytes(), id).filter(is_valid_embedded) {
                    Some(scope) => Some(scope),
                    None => self.load_from_session(id)?,
                }
            }
            ScopeToken::Reference { id } => self.load_from_session(id)?,
        };

        let Some(mut scope) = located else {
            tracing::warn!(scope_id = %token.id(), "request scope not found");
            return Ok(None);
        };

        if scope.portlet_mode_changed {
            scope.attributes.clear();
        } else {
            let stale: Vec<String> = request
                .attributes
                .keys()
                .filter(|name| {
                    !scope.attributes.contains_key(*name)
                        && !self.config.is_retained_attribute(name)
                })
                .cloned()
                .collect();
            for name in stale {
                request.attributes.shift_remove(&name);
                scope.removed_attribute_names.insert(name);
            }
            for (name, value) in &scope.attributes {
                request.attributes.insert(name.clone(), value.clone());
            }
        }

        if self.config.preserve_action_params() {
            for (name, value) in &scope.preserved_action_parameter_map {
                if !request.parameters.contains_key(name) {
                    request.parameters.append(name.clone(), value.clone());
                }
            }
            if let Some(view_state) = &scope.preserved_view_state_param
                && !request.parameters.contains_key(VIEW_STATE_PARAM)
            {
                request.parameters.append(VIEW_STATE_PARAM, view_state.clone());
            }
        }

        tracing::info!(
            scope_id = %scope.id,
            transport = %scope.transport,
            attributes = scope.attributes.len(),
            phase = %request.phase,
            "restored request scope"
        );
        Ok(Some(scope))
    }

    fn load_from_session(&self, id: &str) -> Result<Option<RequestScope>, BridgeError> {
        let Some(bytes) = self.session.get(&scope_session_key(id))? else {
            return Ok(None);
        };
        Ok(decode_scope(&bytes, id).map(|mut scope| {
            scope.persisted = true;
            scope
        }))
    }

    /// Strip attributes matching the exclusion list from the live request.
    ///
    /// Containers with POST-redirect-GET support already isolate action
    /// attributes, so nothing is removed for them.
    pub fn remove_excluded_attributes(
        &self,
        scope: &mut RequestScope,
        request: &mut PhaseRequest,
    ) -> Vec<String> {
        if self.config.post_redirect_get_support() {
            return Vec::new();
        }

        let excluded: Vec<String> = request
            .attributes
            .keys()
            .filter(|name| self.config.is_excluded_attribute(name))
            .cloned()
            .collect();
        for name in &excluded {
            request.attributes.shift_remove(name);
            scope.removed_attribute_names.insert(name.clone());
            tracing::debug!(attribute = %name, "removed excluded attribute");
        }
        excluded
    }

    /// Drop a session-backed scope. Returns whether a session entry was removed.
    pub fn evict(&self, scope: &mut RequestScope) -> Result<bool, BridgeError> {
        if scope.transport != Transport::SessionAttribute {
            return Ok(false);
        }
        let removed = self
            .session
            .remove(&scope_session_key(&scope.id))?
            .is_some();
        scope.persisted = false;
        tracing::debug!(scope_id = %scope.id, removed, "evicted request scope");
        Ok(removed)
    }
}

/// A payload from render parameters must look like something a URL save
/// could have produced: URL transport and string values only.
fn is_valid_embedded(scope: &RequestScope) -> bool {
    let valid = scope.transport == Transport::UrlParameter && scope.is_url_embeddable();
    if !valid {
        tracing::warn!(scope_id = %scope.id, "rejected embedded request scope");
    }
    valid
}

fn decode_scope(bytes: &[u8], expected_id: &str) -> Option<RequestScope> {
    match serde_json::from_slice::<RequestScope>(bytes) {
        Ok(scope) if scope.id == expected_id => Some(scope),
        Ok(scope) => {
            tracing::warn!(
                expected = expected_id,
                found = %scope.id,
                "request scope id mismatch"
            );
            None
        }
        Err(e) => {
            tracing::warn!(scope_id = expected_id, error = %e, "unreadable request scope");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BridgeToml, TransportPolicy};
    use crate::errors::SessionError;
    use crate::scope::{MemorySessionStore, SCOPE_ID_PARAM, SCOPE_STATE_PARAM};
    use serde_json::json;

    /// Config with every env-sensitive setting pinned by overrides.
    fn config_with(f: impl FnOnce(&mut BridgeToml)) -> BridgeConfig {
        let mut toml = BridgeToml::default();
        f(&mut toml);
        let threshold = toml.scope.url_threshold_bytes;
        let transport = toml.scope.transport;
        BridgeConfig::from_toml(toml)
            .with_overrides(Some("p1".to_string()), Some(threshold))
            .with_transport(transport)
    }

    /// Next-phase request carrying the render parameters of `response`.
    fn follow_up(phase: PhaseKind, response: &PhaseResponse) -> PhaseRequest {
        PhaseRequest::new(phase).with_parameters(&response.render_parameters)
    }

    struct BrokenSession;

    impl SessionStore for BrokenSession {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, SessionError> {
            Err(SessionError::Unavailable("down".to_string()))
        }
        fn put(&self, _key: &str, _value: Vec<u8>) -> Result<(), SessionError> {
            Err(SessionError::Unavailable("down".to_string()))
        }
        fn put_if_absent(&self, _key: &str, _value: Vec<u8>) -> Result<bool, SessionError> {
            Err(SessionError::Unavailable("down".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<Option<Vec<u8>>, SessionError> {
            Err(SessionError::Unavailable("down".to_string()))
        }
    }

    #[test]
    fn test_action_to_render_round_trip() {
        let config = config_with(|_| {});
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut scope = manager.create(PhaseKind::Action, PortletMode::View);
        assert!(scope.id().starts_with("p1:"));
        let request = PhaseRequest::new(PhaseKind::Action).with_attribute("msg", "saved");
        let mut response = PhaseResponse::new();
        manager
            .save_state(&mut scope, &request, &HashSet::new(), &mut response)
            .unwrap();

        assert_eq!(scope.transport(), Transport::UrlParameter);
        assert_eq!(response.render_parameters.first(SCOPE_ID_PARAM), Some(scope.id()));
        assert!(response.render_parameters.contains_key(SCOPE_STATE_PARAM));
        assert!(session.is_empty());

        let mut render = follow_up(PhaseKind::Render, &response);
        let restored = manager.restore_state(&mut render).unwrap().unwrap();
        assert_eq!(restored.id(), scope.id());
        assert_eq!(restored.attribute("msg"), Some(&json!("saved")));
        assert_eq!(render.attribute("msg"), Some(&json!("saved")));
    }

    #[test]
    fn test_pre_existing_and_excluded_attributes_are_not_saved() {
        let config = config_with(|toml| {
            toml.scope.excluded_attributes = vec!["internal.*".to_string()];
        });
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut scope = manager.create(PhaseKind::Action, PortletMode::View);
        let request = PhaseRequest::new(PhaseKind::Action)
            .with_attribute("container.user", "alice")
            .with_attribute("internal.token", "secret")
            .with_attribute("msg", "saved");
        let pre_existing = HashSet::from(["container.user".to_string()]);
        let mut response = PhaseResponse::new();
        manager
            .save_state(&mut scope, &request, &pre_existing, &mut response)
            .unwrap();

        let names: Vec<_> = scope.attributes().keys().cloned().collect();
        assert_eq!(names, vec!["msg"]);
    }

    #[test]
    fn test_oversize_scope_moves_to_session() {
        let config = config_with(|toml| toml.scope.url_threshold_bytes = 64);
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut scope = manager.create(PhaseKind::Action, PortletMode::View);
        let request =
            PhaseRequest::new(PhaseKind::Action).with_attribute("big", "x".repeat(256));
        let mut response = PhaseResponse::new();
        manager
            .save_state(&mut scope, &request, &HashSet::new(), &mut response)
            .unwrap();

        assert_eq!(scope.transport(), Transport::SessionAttribute);
        assert_eq!(response.render_parameters.len(), 1);
        assert_eq!(response.render_parameters.first(SCOPE_ID_PARAM), Some(scope.id()));
        assert!(session.contains_key(&scope_session_key(scope.id())));

        let mut render = follow_up(PhaseKind::Render, &response);
        let mut restored = manager.restore_state(&mut render).unwrap().unwrap();
        assert_eq!(render.attribute("big"), Some(&json!("x".repeat(256))));

        assert!(manager.evict(&mut restored).unwrap());
        assert!(session.is_empty());
        assert!(!manager.evict(&mut restored).unwrap());
    }

    #[test]
    fn test_non_string_values_use_session() {
        let config = config_with(|_| {});
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut scope = manager.create(PhaseKind::Event, PortletMode::View);
        let request = PhaseRequest::new(PhaseKind::Event).with_attribute("cart", json!([1, 2]));
        let mut response = PhaseResponse::new();
        manager
            .save_state(&mut scope, &request, &HashSet::new(), &mut response)
            .unwrap();
        assert_eq!(scope.transport(), Transport::SessionAttribute);
        assert!(!response.render_parameters.contains_key(SCOPE_STATE_PARAM));
    }

    #[test]
    fn test_second_save_switching_back_to_url_clears_session_copy() {
        let config = config_with(|_| {});
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut scope = manager.create(PhaseKind::Action, PortletMode::View);
        let request = PhaseRequest::new(PhaseKind::Action).with_attribute("n", 1);
        let mut response = PhaseResponse::new();
        manager
            .save_state(&mut scope, &request, &HashSet::new(), &mut response)
            .unwrap();
        assert_eq!(session.len(), 1);

        scope.remove_attribute("n");
        let request = PhaseRequest::new(PhaseKind::Event).with_attribute("msg", "ok");
        let pre_existing = HashSet::from(["n".to_string()]);
        manager
            .save_state(&mut scope, &request, &pre_existing, &mut response)
            .unwrap();
        assert_eq!(scope.transport(), Transport::UrlParameter);
        assert!(session.is_empty());
        assert!(response.render_parameters.contains_key(SCOPE_STATE_PARAM));
    }

    #[test]
    fn test_mode_change_empties_attributes() {
        let config = config_with(|_| {});
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut scope = manager.create(PhaseKind::Action, PortletMode::View);
        scope.set_portlet_mode_changed(true);
        scope.set_portlet_mode(PortletMode::Edit);
        let request = PhaseRequest::new(PhaseKind::Action).with_attribute("msg", "saved");
        let mut response = PhaseResponse::new();
        manager
            .save_state(&mut scope, &request, &HashSet::new(), &mut response)
            .unwrap();
        assert!(scope.attributes().is_empty());

        let mut render = follow_up(PhaseKind::Render, &response).with_attribute("live", "x");
        let restored = manager.restore_state(&mut render).unwrap().unwrap();
        assert!(restored.attributes().is_empty());
        assert_eq!(restored.portlet_mode(), &PortletMode::Edit);
        assert!(render.attribute("msg").is_none());
    }

    #[test]
    fn test_save_is_all_or_nothing_on_session_failure() {
        let config = config_with(|toml| toml.scope.transport = TransportPolicy::Session);
        let session = BrokenSession;
        let manager = ScopeManager::new(&config, &session);

        let mut scope = manager.create(PhaseKind::Action, PortletMode::View);
        let request = PhaseRequest::new(PhaseKind::Action).with_attribute("msg", "saved");
        let mut response = PhaseResponse::new();
        let err = manager
            .save_state(&mut scope, &request, &HashSet::new(), &mut response)
            .unwrap_err();

        assert!(matches!(err, BridgeError::Session(_)));
        assert!(response.render_parameters.is_empty());
        assert_eq!(scope.transport(), Transport::UrlParameter);
        assert!(scope.attributes().is_empty());
    }

    #[test]
    fn test_restore_propagates_session_failure() {
        let config = config_with(|_| {});
        let session = BrokenSession;
        let manager = ScopeManager::new(&config, &session);
        let mut render = PhaseRequest::new(PhaseKind::Render).with_parameter(SCOPE_ID_PARAM, "p1:x");
        assert!(matches!(
            manager.restore_state(&mut render),
            Err(BridgeError::Session(_))
        ));
    }

    #[test]
    fn test_restore_without_token_is_fresh_start() {
        let config = config_with(|_| {});
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);
        let mut render = PhaseRequest::new(PhaseKind::Render);
        assert!(manager.restore_state(&mut render).unwrap().is_none());

        let mut render = PhaseRequest::new(PhaseKind::Render).with_parameter(SCOPE_ID_PARAM, "gone");
        assert!(manager.restore_state(&mut render).unwrap().is_none());
    }

    #[test]
    fn test_payload_with_wrong_id_falls_back_to_session() {
        let config = config_with(|_| {});
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);
        let mut render = PhaseRequest::new(PhaseKind::Render)
            .with_parameter(SCOPE_ID_PARAM, "p1:a")
            .with_parameter(SCOPE_STATE_PARAM, "not json");
        assert!(manager.restore_state(&mut render).unwrap().is_none());
    }

    #[test]
    fn test_payload_wins_over_session_copy() {
        let config = config_with(|toml| toml.scope.transport = TransportPolicy::Session);
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut scope = manager.create(PhaseKind::Action, PortletMode::View);
        let request = PhaseRequest::new(PhaseKind::Action).with_attribute("msg", "session");
        let mut response = PhaseResponse::new();
        manager
            .save_state(&mut scope, &request, &HashSet::new(), &mut response)
            .unwrap();
        assert!(session.contains_key(&scope_session_key(scope.id())));

        let mut embedded = scope.clone();
        embedded.transport = Transport::UrlParameter;
        embedded.set_attribute("msg", "param");
        let payload = serde_json::to_string(&embedded).unwrap();

        let mut render = PhaseRequest::new(PhaseKind::Render)
            .with_parameter(SCOPE_ID_PARAM, scope.id())
            .with_parameter(SCOPE_STATE_PARAM, payload);
        let restored = manager.restore_state(&mut render).unwrap().unwrap();
        assert_eq!(restored.attribute("msg"), Some(&json!("param")));
        assert_eq!(render.attribute("msg"), Some(&json!("param")));
    }

    #[test]
    fn test_embedded_payload_with_non_string_values_is_rejected() {
        let config = config_with(|_| {});
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut forged = manager.create(PhaseKind::Action, PortletMode::View);
        forged.set_attribute("admin", json!({"admin": true}));
        let payload = serde_json::to_string(&forged).unwrap();
        let mut render = PhaseRequest::new(PhaseKind::Render)
            .with_parameter(SCOPE_ID_PARAM, forged.id())
            .with_parameter(SCOPE_STATE_PARAM, payload.clone());
        assert!(manager.restore_state(&mut render).unwrap().is_none());
        assert!(render.attribute("admin").is_none());

        // the session copy is used instead when there is one
        let mut stored = forged.clone();
        stored.remove_attribute("admin");
        stored.set_attribute("msg", "saved");
        session
            .put(
                &scope_session_key(forged.id()),
                serde_json::to_vec(&stored).unwrap(),
            )
            .unwrap();
        let mut render = PhaseRequest::new(PhaseKind::Render)
            .with_parameter(SCOPE_ID_PARAM, forged.id())
            .with_parameter(SCOPE_STATE_PARAM, payload);
        let restored = manager.restore_state(&mut render).unwrap().unwrap();
        assert_eq!(restored.attribute("msg"), Some(&json!("saved")));
        assert!(render.attribute("admin").is_none());
    }

    #[test]
    fn test_embedded_payload_claiming_session_transport_is_rejected() {
        let config = config_with(|_| {});
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut forged = manager.create(PhaseKind::Action, PortletMode::View);
        forged.transport = Transport::SessionAttribute;
        forged.set_attribute("msg", "saved");
        let mut render = PhaseRequest::new(PhaseKind::Render)
            .with_parameter(SCOPE_ID_PARAM, forged.id())
            .with_parameter(SCOPE_STATE_PARAM, serde_json::to_string(&forged).unwrap());
        assert!(manager.restore_state(&mut render).unwrap().is_none());
        assert!(render.attribute("msg").is_none());
    }

    #[test]
    fn test_event_save_drops_attributes_removed_from_request() {
        let config = config_with(|_| {});
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut scope = manager.create(PhaseKind::Action, PortletMode::View);
        let request = PhaseRequest::new(PhaseKind::Action)
            .with_attribute("msg", "saved")
            .with_attribute("keep", "yes");
        let mut response = PhaseResponse::new();
        manager
            .save_state(&mut scope, &request, &HashSet::new(), &mut response)
            .unwrap();

        let mut event = follow_up(PhaseKind::Event, &response);
        let pre_existing: HashSet<String> = event.attributes.keys().cloned().collect();
        let mut restored = manager.restore_state(&mut event).unwrap().unwrap();
        event.remove_attribute("msg");
        let mut event_response = PhaseResponse::new();
        manager
            .save_state(&mut restored, &event, &pre_existing, &mut event_response)
            .unwrap();

        let names: Vec<_> = restored.attributes().keys().cloned().collect();
        assert_eq!(names, vec!["keep"]);
    }

    #[test]
    fn test_restore_removes_stale_attributes_except_retained() {
        let config = config_with(|toml| {
            toml.scope.retained_attributes = vec!["container.*".to_string()];
        });
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut scope = manager.create(PhaseKind::Action, PortletMode::View);
        let request = PhaseRequest::new(PhaseKind::Action).with_attribute("msg", "saved");
        let mut response = PhaseResponse::new();
        manager
            .save_state(&mut scope, &request, &HashSet::new(), &mut response)
            .unwrap();

        let mut render = follow_up(PhaseKind::Render, &response)
            .with_attribute("stale", "old")
            .with_attribute("container.locale", "en");
        let restored = manager.restore_state(&mut render).unwrap().unwrap();

        assert!(render.attribute("stale").is_none());
        assert_eq!(render.attribute("container.locale"), Some(&json!("en")));
        assert!(restored.removed_attribute_names().contains("stale"));
        assert!(!restored.removed_attribute_names().contains("container.locale"));
    }

    #[test]
    fn test_preserve_action_params_and_view_state() {
        let config = config_with(|toml| toml.scope.preserve_action_params = true);
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);

        let mut scope = manager.create(PhaseKind::Action, PortletMode::View);
        let request = PhaseRequest::new(PhaseKind::Action)
            .with_parameter("query", "shoes")
            .with_parameter(VIEW_STATE_PARAM, "state-1")
            .with_parameter(SCOPE_ID_PARAM, "old");
        let mut response = PhaseResponse::new();
        manager
            .save_state(&mut scope, &request, &HashSet::new(), &mut response)
            .unwrap();

        assert_eq!(
            scope.preserved_action_parameter_map().get("query").map(String::as_str),
            Some("shoes")
        );
        assert!(!scope.preserved_action_parameter_map().contains_key(SCOPE_ID_PARAM));
        assert_eq!(scope.preserved_view_state_param(), Some("state-1"));

        let mut render = follow_up(PhaseKind::Render, &response);
        manager.restore_state(&mut render).unwrap().unwrap();
        assert_eq!(render.parameters.first("query"), Some("shoes"));
        assert_eq!(render.parameters.first(VIEW_STATE_PARAM), Some("state-1"));
    }

    #[test]
    fn test_remove_excluded_attributes() {
        let config = config_with(|toml| {
            toml.scope.excluded_attributes = vec!["internal.*".to_string()];
        });
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);
        let mut scope = manager.create(PhaseKind::Render, PortletMode::View);
        let mut request = PhaseRequest::new(PhaseKind::Render)
            .with_attribute("internal.flash", "x")
            .with_attribute("msg", "keep");

        let removed = manager.remove_excluded_attributes(&mut scope, &mut request);
        assert_eq!(removed, vec!["internal.flash"]);
        assert!(request.attribute("internal.flash").is_none());
        assert!(request.attribute("msg").is_some());
        assert!(scope.removed_attribute_names().contains("internal.flash"));
    }

    #[test]
    fn test_remove_excluded_is_noop_with_prg_support() {
        let config = config_with(|toml| {
            toml.scope.excluded_attributes = vec!["*".to_string()];
            toml.scope.post_redirect_get_support = true;
        });
        let session = MemorySessionStore::new();
        let manager = ScopeManager::new(&config, &session);
        let mut scope = manager.create(PhaseKind::Render, PortletMode::View);
        let mut request = PhaseRequest::new(PhaseKind::Render).with_attribute("a", "1");
        assert!(manager.remove_excluded_attributes(&mut scope, &mut request).is_empty());
        assert!(request.attribute("a").is_some());
    }
}
