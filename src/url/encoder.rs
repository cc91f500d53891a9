//! URL encoding for the five kinds of URL a view can ask for.
//!
//! Internal view targets are rewritten into the `portlet:` wire format,
//! `portlet:<phase-token><context-relative-path>?<query>`, which the host
//! turns into a real container URL for the named phase. Everything that
//! does not point at a view of this application (opaque URLs, absolute URLs,
//! paths outside the context) passes through untouched.

use serde::Serialize;

use super::classify::{ClassifiedUrl, PORTLET_SCHEME_PREFIX, classify};
use super::params::ParameterMap;
use crate::errors::BridgeError;
use crate::phase::PhaseKind;
use crate::scope::{RequestScope, SCOPE_ID_PARAM, SCOPE_STATE_PARAM, ScopeToken, Transport};
use crate::view::ViewResolver;

/// Which encode operation produced a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlKind {
    Action,
    Bookmarkable,
    PartialAction,
    Redirect,
    Resource,
}

impl UrlKind {
    pub fn all() -> &'static [UrlKind] {
        &[
            UrlKind::Action,
            UrlKind::Bookmarkable,
            UrlKind::PartialAction,
            UrlKind::Redirect,
            UrlKind::Resource,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UrlKind::Action => "action",
            UrlKind::Bookmarkable => "bookmarkable",
            UrlKind::PartialAction => "partial_action",
            UrlKind::Redirect => "redirect",
            UrlKind::Resource => "resource",
        }
    }
}

impl std::fmt::Display for UrlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UrlKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "action" => Ok(UrlKind::Action),
            "bookmarkable" | "render" => Ok(UrlKind::Bookmarkable),
            "partial_action" | "partial" => Ok(UrlKind::PartialAction),
            "redirect" => Ok(UrlKind::Redirect),
            "resource" => Ok(UrlKind::Resource),
            _ => anyhow::bail!(
                "Invalid URL kind '{}'. Valid kinds: action, bookmarkable, partial_action, redirect, resource",
                s
            ),
        }
    }
}

/// Result of an encode operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedUrl {
    pub kind: UrlKind,
    /// Phase the URL resumes in, for portlet-scheme results
    pub target_phase: Option<PhaseKind>,
    pub url: String,
    /// Query separators are written as `&amp;`
    pub escaped: bool,
    /// The URL was rewritten into the portlet scheme
    pub rewritten: bool,
}

impl EncodedUrl {
    pub fn is_partial(&self) -> bool {
        self.kind == UrlKind::PartialAction
    }
}

impl std::fmt::Display for EncodedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// Encodes URLs for one request.
#[derive(Clone, Copy)]
pub struct UrlEncoder<'a> {
    context_path: &'a str,
    views: Option<&'a dyn ViewResolver>,
    scope: Option<&'a RequestScope>,
}

impl<'a> UrlEncoder<'a> {
    pub fn new(context_path: &'a str) -> Self {
        Self {
            context_path,
            views: None,
            scope: None,
        }
    }

    /// View resolver used by redirect encoding.
    pub fn with_views(mut self, views: &'a dyn ViewResolver) -> Self {
        self.views = Some(views);
        self
    }

    /// Scope whose id action URLs carry.
    pub fn with_scope(mut self, scope: Option<&'a RequestScope>) -> Self {
        self.scope = scope;
        self
    }

    /// URL that submits to the Action phase.
    pub fn encode_action(&self, url: &str) -> EncodedUrl {
        self.encode_submit(url, UrlKind::Action)
    }

    /// Same as `encode_action`, marked as a partial (ajax) submit.
    pub fn encode_partial_action(&self, url: &str) -> EncodedUrl {
        self.encode_submit(url, UrlKind::PartialAction)
    }

    fn encode_submit(&self, url: &str, kind: UrlKind) -> EncodedUrl {
        let classified = classify(url);
        let token = self.scope_token();

        if classified.is_portlet_scheme() {
            let mut params = classified.parameters().clone();
            if let Some(token) = &token {
                params.merge(token);
            }
            return merged(&classified, kind, &params);
        }
        if classified.is_opaque() {
            return unchanged(&classified, kind);
        }
        if self.targets_view(&classified) {
            let mut params = classified.parameters().clone();
            if let Some(token) = &token {
                params.merge(token);
            }
            return self.rewrite(&classified, kind, PhaseKind::Action, &params);
        }
        unchanged(&classified, kind)
    }

    /// URL that renders a view directly and survives being bookmarked.
    /// Never carries the scope token.
    pub fn encode_bookmarkable(&self, base: &str, params: &ParameterMap) -> EncodedUrl {
        let classified = classify(base);
        if classified.is_opaque() {
            return unchanged(&classified, UrlKind::Bookmarkable);
        }

        let mut merged_params = classified.parameters().clone();
        merged_params.merge(params);
        merged_params.remove(SCOPE_ID_PARAM);
        merged_params.remove(SCOPE_STATE_PARAM);

        if !classified.is_portlet_scheme() && self.targets_view(&classified) {
            return self.rewrite(
                &classified,
                UrlKind::Bookmarkable,
                PhaseKind::Render,
                &merged_params,
            );
        }
        merged(&classified, UrlKind::Bookmarkable, &merged_params)
    }

    /// Redirect target. Internal targets must resolve to a view.
    pub fn encode_redirect(
        &self,
        base: &str,
        params: &ParameterMap,
    ) -> Result<EncodedUrl, BridgeError> {
        let classified = classify(base);
        if classified.is_opaque() && !classified.is_portlet_scheme() {
            return Ok(unchanged(&classified, UrlKind::Redirect));
        }

        let mut merged_params = classified.parameters().clone();
        merged_params.merge(params);

        if classified.is_portlet_scheme()
            || classified.is_absolute()
            || classified.is_fragment_only()
            || classified.is_external(self.context_path)
        {
            if params.is_empty() {
                return Ok(unchanged(&classified, UrlKind::Redirect));
            }
            return Ok(merged(&classified, UrlKind::Redirect, &merged_params));
        }

        let views = self.views.ok_or(BridgeError::FactoryNotFound {
            factory: "view_resolver",
        })?;
        let path = view_path(&classified.context_relative_path(self.context_path));
        let view_id = views
            .view_id_from_path(&path, true)
            .ok_or_else(|| BridgeError::InvalidViewPath {
                path: base.to_string(),
            })?;

        tracing::debug!(url = base, view_id = %view_id, "redirect resolved to view");
        Ok(EncodedUrl {
            kind: UrlKind::Redirect,
            target_phase: Some(PhaseKind::Render),
            url: assemble(
                &format!("{PORTLET_SCHEME_PREFIX}{}{}", PhaseKind::Render, view_id),
                &merged_params,
                classified.is_escaped(),
                classified.fragment(),
            ),
            escaped: classified.is_escaped(),
            rewritten: true,
        })
    }

    /// URL served by the Resource phase.
    pub fn encode_resource(&self, base: &str, params: &ParameterMap) -> EncodedUrl {
        let classified = classify(base);
        if classified.is_opaque() && !classified.is_portlet_scheme() {
            return unchanged(&classified, UrlKind::Resource);
        }

        let mut merged_params = classified.parameters().clone();
        merged_params.merge(params);

        if !classified.is_portlet_scheme() && self.targets_view(&classified) {
            return self.rewrite(
                &classified,
                UrlKind::Resource,
                PhaseKind::Resource,
                &merged_params,
            );
        }
        if params.is_empty() {
            return unchanged(&classified, UrlKind::Resource);
        }
        merged(&classified, UrlKind::Resource, &merged_params)
    }

    /// Relative, inside the context, and not a same-document fragment.
    fn targets_view(&self, url: &ClassifiedUrl) -> bool {
        url.is_relative() && !url.is_fragment_only() && !url.is_external(self.context_path)
    }

    fn scope_token(&self) -> Option<ParameterMap> {
        let scope = self.scope.filter(|s| s.transport() == Transport::UrlParameter)?;
        let token = ScopeToken::Reference {
            id: scope.id().to_string(),
        };
        Some(token.to_parameters().into_iter().collect())
    }

    fn rewrite(
        &self,
        url: &ClassifiedUrl,
        kind: UrlKind,
        phase: PhaseKind,
        params: &ParameterMap,
    ) -> EncodedUrl {
        let path = view_path(&url.context_relative_path(self.context_path));
        EncodedUrl {
            kind,
            target_phase: Some(phase),
            url: assemble(
                &format!("{PORTLET_SCHEME_PREFIX}{phase}{path}"),
                params,
                url.is_escaped(),
                url.fragment(),
            ),
            escaped: url.is_escaped(),
            rewritten: true,
        }
    }
}

fn unchanged(url: &ClassifiedUrl, kind: UrlKind) -> EncodedUrl {
    EncodedUrl {
        kind,
        target_phase: url.target_phase(),
        url: url.raw().to_string(),
        escaped: url.is_escaped(),
        rewritten: false,
    }
}

/// Keep everything before the query and replace the query with `params`.
fn merged(url: &ClassifiedUrl, kind: UrlKind, params: &ParameterMap) -> EncodedUrl {
    let head = url.raw().split(['?', '#']).next().unwrap_or_default();
    EncodedUrl {
        kind,
        target_phase: url.target_phase(),
        url: assemble(head, params, url.is_escaped(), url.fragment()),
        escaped: url.is_escaped(),
        rewritten: false,
    }
}

fn assemble(head: &str, params: &ParameterMap, escaped: bool, fragment: Option<&str>) -> String {
    let mut url = head.to_string();
    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.to_query(escaped));
    }
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}

/// Path-relative targets are taken from the context root.
fn view_path(path: &str) -> String {
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
