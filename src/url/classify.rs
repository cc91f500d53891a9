//! URL classification.
//!
//! `classify` breaks a raw URL string into the structural facts the encoder
//! and redirect logic branch on: scheme presence, opacity, hierarchy, path
//! relativity, externality relative to a context path, and the phase marker
//! embedded in `portlet:` URLs.
//!
//! Classification never fails. Input that cannot be read as an absolute URL
//! is treated as a relative path.

use percent_encoding::percent_decode_str;

use super::params::{ESCAPED_AMPERSAND, ParameterMap};
use crate::phase::PhaseKind;

/// Scheme reserved for bridge-internal URLs.
pub const PORTLET_SCHEME: &str = "portlet";

/// Literal prefix of every portlet-scheme URL.
pub const PORTLET_SCHEME_PREFIX: &str = "portlet:";

/// A URL broken into its structural parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedUrl {
    raw: String,
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
    parameters: ParameterMap,
    opaque: bool,
    escaped: bool,
    portlet_scheme: bool,
    target_phase: Option<PhaseKind>,
}

/// Classify a raw URL string.
pub fn classify(raw: &str) -> ClassifiedUrl {
    let escaped = detect_escaped(raw);

    let scheme_end = raw
        .find([':', '/', '?', '#'])
        .filter(|&i| raw.as_bytes()[i] == b':');

    let Some(colon) = scheme_end else {
        return relative(raw, escaped);
    };

    let scheme = &raw[..colon];
    if !is_valid_scheme(scheme) {
        return malformed(raw, escaped);
    }

    let scheme_specific = &raw[colon + 1..];
    if raw.starts_with(PORTLET_SCHEME_PREFIX) {
        return portlet(raw, scheme_specific, escaped);
    }

    let (before_fragment, fragment) = split_once_owned(scheme_specific, '#');

    if !scheme_specific.starts_with('/') {
        // Opaque URLs (mailto:, javascript:, urn:) are not decomposed further.
        return ClassifiedUrl {
            raw: raw.to_string(),
            scheme: Some(scheme.to_string()),
            authority: None,
            path: String::new(),
            query: None,
            fragment,
            parameters: ParameterMap::new(),
            opaque: true,
            escaped,
            portlet_scheme: false,
            target_phase: None,
        };
    }

    let (hier_part, query) = split_once_owned(before_fragment, '?');
    let (authority, path) = match hier_part.strip_prefix("//") {
        Some(rest) => {
            let end = rest.find('/').unwrap_or(rest.len());
            (Some(rest[..end].to_string()), rest[end..].to_string())
        }
        None => (None, hier_part.to_string()),
    };

    let parameters = parse_parameters(query.as_deref(), escaped);

    ClassifiedUrl {
        raw: raw.to_string(),
        scheme: Some(scheme.to_string()),
        authority,
        path,
        query,
        fragment,
        parameters,
        opaque: false,
        escaped,
        portlet_scheme: false,
        target_phase: None,
    }
}

fn relative(raw: &str, escaped: bool) -> ClassifiedUrl {
    let (before_fragment, fragment) = split_once_owned(raw, '#');
    let (path, query) = split_once_owned(before_fragment, '?');
    let parameters = parse_parameters(query.as_deref(), escaped);

    ClassifiedUrl {
        raw: raw.to_string(),
        scheme: None,
        authority: None,
        path: path.to_string(),
        query,
        fragment,
        parameters,
        opaque: false,
        escaped,
        portlet_scheme: false,
        target_phase: None,
    }
}

fn malformed(raw: &str, escaped: bool) -> ClassifiedUrl {
    tracing::debug!(url = raw, "malformed scheme, treating URL as a relative path");
    ClassifiedUrl {
        raw: raw.to_string(),
        scheme: None,
        authority: None,
        path: raw.to_string(),
        query: None,
        fragment: None,
        parameters: ParameterMap::new(),
        opaque: false,
        escaped,
        portlet_scheme: false,
        target_phase: None,
    }
}

/// `portlet:<phase-token>/<path>?<query>`
fn portlet(raw: &str, scheme_specific: &str, escaped: bool) -> ClassifiedUrl {
    let (before_fragment, fragment) = split_once_owned(scheme_specific, '#');
    let (hier_part, query) = split_once_owned(before_fragment, '?');
    let token_end = hier_part.find('/').unwrap_or(hier_part.len());
    let target_phase = hier_part[..token_end].parse::<PhaseKind>().ok();
    let parameters = parse_parameters(query.as_deref(), escaped);

    ClassifiedUrl {
        raw: raw.to_string(),
        scheme: Some(PORTLET_SCHEME.to_string()),
        authority: None,
        path: hier_part[token_end..].to_string(),
        query,
        fragment,
        parameters,
        opaque: !scheme_specific.starts_with('/'),
        escaped,
        portlet_scheme: true,
        target_phase,
    }
}

fn parse_parameters(query: Option<&str>, escaped: bool) -> ParameterMap {
    query
        .map(|q| ParameterMap::parse_query(q, escaped))
        .unwrap_or_default()
}

fn split_once_owned(s: &str, delimiter: char) -> (&str, Option<String>) {
    match s.split_once(delimiter) {
        Some((head, tail)) => (head, Some(tail.to_string())),
        None => (s, None),
    }
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

fn detect_escaped(raw: &str) -> bool {
    let mut ampersands = raw.match_indices('&').peekable();
    ampersands.peek().is_some()
        && ampersands.all(|(i, _)| raw[i..].starts_with(ESCAPED_AMPERSAND))
}

/// Remainder of `path` below `base`, compared segment by segment with each
/// path segment percent-decoded. `None` when `path` lies outside `base`.
fn strip_context<'p>(path: &'p str, base: &str) -> Option<&'p str> {
    let base = base.trim_matches('/');
    if base.is_empty() {
        return Some(path);
    }
    let mut rest = path;
    for expected in base.split('/') {
        rest = rest.strip_prefix('/')?;
        let end = rest.find('/').unwrap_or(rest.len());
        if percent_decode_str(&rest[..end]).decode_utf8_lossy() != expected {
            return None;
        }
        rest = &rest[end..];
    }
    Some(rest)
}

impl ClassifiedUrl {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    pub fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    /// Has a scheme component.
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }

    pub fn is_relative(&self) -> bool {
        !self.is_absolute()
    }

    /// Absolute, and the scheme-specific part does not begin with `/`.
    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    /// Relative, or absolute with a scheme-specific part beginning with `/`.
    pub fn is_hierarchical(&self) -> bool {
        !self.opaque
    }

    pub fn is_path_relative(&self) -> bool {
        !self.path.starts_with('/')
    }

    /// Every ampersand appears as `&amp;`.
    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    pub fn is_portlet_scheme(&self) -> bool {
        self.portlet_scheme
    }

    /// Phase marker of a portlet-scheme URL.
    pub fn target_phase(&self) -> Option<PhaseKind> {
        self.target_phase
    }

    /// Only a `#fragment`, pointing into the current document.
    pub fn is_fragment_only(&self) -> bool {
        self.raw.starts_with('#')
    }

    /// Whether the URL leaves the given context path.
    ///
    /// Absolute URLs are never external by this test; relative paths
    /// (`page.xhtml`, `?a=1`, `#top`) resolve against the current view and so
    /// stay inside. Only root-relative paths outside `context_path` qualify,
    /// compared segment by segment on the decoded path.
    pub fn is_external(&self, context_path: &str) -> bool {
        if self.is_absolute() || self.is_path_relative() {
            return false;
        }
        strip_context(&self.path, context_path).is_none()
    }

    /// Path relative to `context_path`; unchanged when the path lies outside it.
    pub fn context_relative_path(&self, context_path: &str) -> String {
        match strip_context(&self.path, context_path) {
            Some("") => "/".to_string(),
            Some(rest) => rest.to_string(),
            None => self.path.clone(),
        }
    }
}

impl std::fmt::Display for ClassifiedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
