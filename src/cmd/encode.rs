//! URL encoding (`phase-bridge encode`).

use anyhow::{Context, Result};

use phase_bridge::config::BridgeConfig;
use phase_bridge::phase::{PhaseKind, PortletMode};
use phase_bridge::scope::RequestScope;
use phase_bridge::url::{ParameterMap, UrlEncoder, UrlKind};
use phase_bridge::view::MappedViewResolver;

use super::parse_assignments;

pub fn cmd_encode(
    config: &BridgeConfig,
    kind: &str,
    url: &str,
    params: &[String],
    context_path: Option<&str>,
    with_scope: bool,
) -> Result<()> {
    let kind: UrlKind = kind.parse()?;
    let params: ParameterMap = parse_assignments(params)?.into_iter().collect();
    let context_path = context_path.unwrap_or(config.context_path());

    let views = MappedViewResolver::new(&config.toml.views);
    let scope = with_scope
        .then(|| RequestScope::new(&config.id_prefix(), PhaseKind::Action, PortletMode::View));
    let encoder = UrlEncoder::new(context_path)
        .with_views(&views)
        .with_scope(scope.as_ref());

    if !params.is_empty() && matches!(kind, UrlKind::Action | UrlKind::PartialAction) {
        tracing::warn!(kind = %kind, "extra parameters are ignored for submit URLs");
    }

    let encoded = match kind {
        UrlKind::Action => encoder.encode_action(url),
        UrlKind::PartialAction => encoder.encode_partial_action(url),
        UrlKind::Bookmarkable => encoder.encode_bookmarkable(url, &params),
        UrlKind::Redirect => encoder
            .encode_redirect(url, &params)
            .with_context(|| format!("Failed to encode redirect URL '{}'", url))?,
        UrlKind::Resource => encoder.encode_resource(url, &params),
    };

    println!("{}", serde_json::to_string_pretty(&encoded)?);
    Ok(())
}
