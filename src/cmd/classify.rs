//! URL classification report (`phase-bridge classify`).

use anyhow::Result;
use serde_json::json;

use phase_bridge::config::BridgeConfig;
use phase_bridge::url::classify;

pub fn cmd_classify(config: &BridgeConfig, url: &str, context_path: Option<&str>) -> Result<()> {
    let context_path = context_path.unwrap_or(config.context_path());
    let classified = classify(url);

    let facts = json!({
        "raw": classified.raw(),
        "scheme": classified.scheme(),
        "authority": classified.authority(),
        "path": classified.path(),
        "query": classified.query(),
        "fragment": classified.fragment(),
        "parameters": classified.parameters(),
        "absolute": classified.is_absolute(),
        "relative": classified.is_relative(),
        "opaque": classified.is_opaque(),
        "hierarchical": classified.is_hierarchical(),
        "path_relative": classified.is_path_relative(),
        "escaped": classified.is_escaped(),
        "external": classified.is_external(context_path),
        "portlet_scheme": classified.is_portlet_scheme(),
        "target_phase": classified.target_phase(),
        "context_path": context_path,
        "context_relative_path": classified.context_relative_path(context_path),
    });

    println!("{}", serde_json::to_string_pretty(&facts)?);
    Ok(())
}
