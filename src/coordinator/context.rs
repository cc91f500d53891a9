use std::collections::HashSet;

use super::{VIEW_ID_ATTRIBUTE, VIEW_ID_PARAM, VIEW_PATH_ATTRIBUTE};
use crate::config::BridgeConfig;
use crate::errors::BridgeError;
use crate::host::{PhaseRequest, PhaseResponse};
use crate::phase::{PhaseKind, PortletMode};
use crate::scope::{RequestScope, ScopeManager, SessionStore};
use crate::url::{EncodedUrl, ParameterMap, UrlEncoder, classify};
use crate::view::ViewResolver;

/// Where a redirect went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Left the application; the host sends a real redirect
    External(String),
    /// Navigated to a view of this application
    Internal { view_id: String },
}

/// View selection signals, read before the scope is restored so restored
/// attributes never act as signals.
#[derive(Debug, Default)]
struct ViewSignals {
    view_id: Option<String>,
    view_path: Option<String>,
    view_id_param: Option<String>,
    query: Option<String>,
}

impl ViewSignals {
    fn capture(request: &PhaseRequest) -> Self {
        let view_id = string_attribute(request, VIEW_ID_ATTRIBUTE);
        let view_path = string_attribute(request, VIEW_PATH_ATTRIBUTE);
        let view_id_param = request
            .parameters
            .first(VIEW_ID_PARAM)
            .filter(|s| !s.is_empty());

        let query = [view_id, view_path, view_id_param]
            .into_iter()
            .flatten()
            .next()
            .and_then(|signal| signal.split_once('?'))
            .map(|(_, query)| query.to_string());

        Self {
            view_id: view_id.map(strip_query),
            view_path: view_path.map(strip_query),
            view_id_param: view_id_param.map(strip_query),
            query,
        }
    }
}

fn string_attribute<'r>(request: &'r PhaseRequest, name: &str) -> Option<&'r str> {
    request
        .attribute(name)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

fn strip_query(signal: &str) -> String {
    signal.split('?').next().unwrap_or_default().to_string()
}

/// Per-request bridge state, owned by exactly one phase request.
///
/// Obtained from `PhaseCoordinator::begin` or inside
/// `PhaseCoordinator::execute`.
pub struct PhaseContext<'a> {
    config: &'a BridgeConfig,
    views: &'a dyn ViewResolver,
    session: &'a dyn SessionStore,
    request: &'a mut PhaseRequest,
    response: &'a mut PhaseResponse,
    scope: Option<RequestScope>,
    /// The scope was created or modified through this context
    touched: bool,
    pre_existing: HashSet<String>,
    signals: ViewSignals,
    render_redirect_view_id: Option<String>,
    render_redirect_query: Option<String>,
    released: bool,
}

impl<'a> PhaseContext<'a> {
    pub(super) fn open(
        config: &'a BridgeConfig,
        views: &'a dyn ViewResolver,
        request: &'a mut PhaseRequest,
        response: &'a mut PhaseResponse,
        session: &'a dyn SessionStore,
    ) -> Result<Self, BridgeError> {
        let phase = request.phase;
        let pre_existing: HashSet<String> = request.attributes.keys().cloned().collect();
        let signals = ViewSignals::capture(request);
        let manager = ScopeManager::new(config, session);

        let mut scope = None;
        if phase.restores_state() {
            scope = manager.restore_state(request)?;
        }
        if phase == PhaseKind::Render
            && let Some(scope) = scope.as_mut()
        {
            manager.remove_excluded_attributes(scope, request);
        }

        // A restored scope keeps travelling through Event phases.
        let touched = phase == PhaseKind::Event && scope.is_some();
        tracing::debug!(
            phase = %phase,
            restored = scope.is_some(),
            namespace = %request.namespace,
            "opened phase context"
        );

        Ok(Self {
            config,
            views,
            session,
            request,
            response,
            scope,
            touched,
            pre_existing,
            signals,
            render_redirect_view_id: None,
            render_redirect_query: None,
            released: false,
        })
    }

    pub fn phase(&self) -> PhaseKind {
        self.request.phase
    }

    pub fn request(&self) -> &PhaseRequest {
        &*self.request
    }

    pub fn request_mut(&mut self) -> &mut PhaseRequest {
        &mut *self.request
    }

    pub fn response(&self) -> &PhaseResponse {
        &*self.response
    }

    pub fn response_mut(&mut self) -> &mut PhaseResponse {
        &mut *self.response
    }

    /// Mode in effect: a mode requested during this phase wins over the
    /// request's.
    pub fn portlet_mode(&self) -> &PortletMode {
        self.response
            .portlet_mode
            .as_ref()
            .unwrap_or(&self.request.portlet_mode)
    }

    /// The request scope, created on first access.
    ///
    /// Only Action and Event phases persist the scope. A scope first
    /// created during Render or Resource lives for this request alone and
    /// is never saved, so nothing reaches the next phase through it.
    pub fn request_scope(&mut self) -> &mut RequestScope {
        self.touched = true;
        let (config, session) = (self.config, self.session);
        let phase = self.request.phase;
        let mode = self.request.portlet_mode.clone();
        self.scope
            .get_or_insert_with(|| ScopeManager::new(config, session).create(phase, mode))
    }

    /// The request scope, if one was restored or created.
    pub fn current_request_scope(&self) -> Option<&RequestScope> {
        self.scope.as_ref()
    }

    /// Set a request attribute that the next phase should see.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.request_scope();
        self.request.set_attribute(name, value);
    }

    /// Switch portlet mode. In Action/Event phases the scope records the
    /// change so the next save drops the preserved attributes.
    pub fn set_portlet_mode(&mut self, mode: PortletMode) {
        if *self.portlet_mode() == mode {
            return;
        }
        self.response.set_portlet_mode(mode.clone());
        if self.request.phase.saves_state() {
            let scope = self.request_scope();
            scope.set_portlet_mode_changed(true);
            scope.set_portlet_mode(mode);
        }
    }

    /// View id signaled by an internal redirect during this Render phase.
    pub fn render_redirect_view_id(&self) -> Option<&str> {
        self.render_redirect_view_id.as_deref()
    }

    /// The view to render, checked in order: render redirect, view id
    /// attribute, view path attribute, view id parameter, default view of
    /// the current mode.
    pub fn resolve_view_id(&self) -> Result<String, BridgeError> {
        if let Some(view_id) = &self.render_redirect_view_id {
            return Ok(view_id.clone());
        }
        if let Some(view_id) = &self.signals.view_id {
            return Ok(view_id.clone());
        }
        if let Some(path) = &self.signals.view_path {
            return self
                .views
                .view_id_from_path(path, true)
                .ok_or_else(|| BridgeError::InvalidViewPath { path: path.clone() });
        }
        if let Some(view_id) = &self.signals.view_id_param {
            return Ok(view_id.clone());
        }

        let mode = self.portlet_mode();
        self.views
            .default_view_id(mode)
            .ok_or_else(|| BridgeError::DefaultViewNotSpecified {
                mode: mode.to_string(),
            })
    }

    /// Query string that accompanied the signaled view.
    pub fn view_query_string(&self) -> Option<&str> {
        if self.render_redirect_view_id.is_some() {
            return self.render_redirect_query.as_deref();
        }
        self.signals.query.as_deref()
    }

    /// Redirect to `url`.
    ///
    /// External targets become a container redirect. Internal targets are
    /// resolved to a view: during Action/Event the view id travels to the
    /// next Render as a render parameter; during Render/Resource the view
    /// is dispatched to directly.
    pub fn redirect(&mut self, url: &str) -> Result<RedirectOutcome, BridgeError> {
        let classified = classify(url);
        let context_path = self.context_path().to_string();

        if classified.is_absolute()
            || classified.is_fragment_only()
            || classified.is_external(&context_path)
        {
            tracing::info!(url, phase = %self.phase(), "external redirect");
            self.response.send_redirect(url);
            return Ok(RedirectOutcome::External(url.to_string()));
        }

        let relative = classified.context_relative_path(&context_path);
        let path = if relative.starts_with('/') {
            relative
        } else {
            format!("/{relative}")
        };
        let view_id = self
            .views
            .view_id_from_path(&path, true)
            .ok_or_else(|| BridgeError::InvalidViewPath {
                path: url.to_string(),
            })?;
        let query = classified.query().map(str::to_string);

        if self.request.phase.saves_state() {
            let scope = self.request_scope();
            scope.set_navigation_occurred(true);
            scope.set_redirect_occurred(true);
            let target = match &query {
                Some(query) => format!("{view_id}?{query}"),
                None => view_id.clone(),
            };
            self.response.set_render_parameter(VIEW_ID_PARAM, target);
        } else {
            self.render_redirect_view_id = Some(view_id.clone());
            self.render_redirect_query = query;
            self.response.dispatch(view_id.clone());
        }

        tracing::info!(url, view_id = %view_id, phase = %self.phase(), "internal redirect");
        Ok(RedirectOutcome::Internal { view_id })
    }

    /// Context path from the request, falling back to the configured one.
    pub fn context_path(&self) -> &str {
        if self.request.context_path.is_empty() {
            self.config.context_path()
        } else {
            &self.request.context_path
        }
    }

    fn encoder(&self) -> UrlEncoder<'_> {
        UrlEncoder::new(self.context_path())
            .with_views(self.views)
            .with_scope(self.scope.as_ref())
    }

    pub fn encode_action_url(&self, url: &str) -> EncodedUrl {
        self.encoder().encode_action(url)
    }

    pub fn encode_partial_action_url(&self, url: &str) -> EncodedUrl {
        self.encoder().encode_partial_action(url)
    }

    pub fn encode_bookmarkable_url(&self, base: &str, params: &ParameterMap) -> EncodedUrl {
        self.encoder().encode_bookmarkable(base, params)
    }

    pub fn encode_redirect_url(
        &self,
        base: &str,
        params: &ParameterMap,
    ) -> Result<EncodedUrl, BridgeError> {
        self.encoder().encode_redirect(base, params)
    }

    pub fn encode_resource_url(&self, base: &str, params: &ParameterMap) -> EncodedUrl {
        self.encoder().encode_resource(base, params)
    }

    /// Prefix `name` with the portlet namespace.
    pub fn encode_namespace(&self, name: &str) -> String {
        format!("{}{}", self.request.namespace, name)
    }

    /// Client id of a component inside the portlet's naming container.
    pub fn container_client_id(&self, id: &str) -> String {
        if self.request.namespace.is_empty() {
            id.to_string()
        } else {
            format!("{}:{}", self.request.namespace, id)
        }
    }

    /// Init parameter; portlet-level values override application-level ones.
    pub fn init_param(&self, name: &str) -> Option<&str> {
        self.config.init_param(name)
    }

    /// Finish the phase: save the scope after Action/Event (when it was
    /// used), evict it after Render. Idempotent.
    pub fn release(&mut self) -> Result<(), BridgeError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let manager = ScopeManager::new(self.config, self.session);
        match self.request.phase {
            PhaseKind::Action | PhaseKind::Event => {
                if !self.touched {
                    return Ok(());
                }
                if let Some(scope) = self.scope.as_mut() {
                    scope.set_faces_lifecycle_executed(true);
                    manager.save_state(
                        scope,
                        &*self.request,
                        &self.pre_existing,
                        &mut *self.response,
                    )?;
                }
            }
            PhaseKind::Render => {
                if self.config.evict_after_render()
                    && let Some(scope) = self.scope.as_mut()
                {
                    manager.evict(scope)?;
                }
            }
            PhaseKind::Resource => {}
        }
        Ok(())
    }
}

impl Drop for PhaseContext<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.release() {
            tracing::warn!(phase = %self.request.phase, error = %e, "failed to release phase context");
        }
    }
}
