//! Action → Render walk-through (`phase-bridge simulate`).

use anyhow::Result;
use serde::Serialize;

use phase_bridge::config::{BridgeConfig, TransportPolicy};
use phase_bridge::coordinator::{PhaseCoordinator, RedirectOutcome};
use phase_bridge::host::{PhaseRequest, PhaseResponse};
use phase_bridge::phase::{PhaseKind, PortletMode};
use phase_bridge::registry::BridgeRegistry;
use phase_bridge::scope::{AttributeMap, MemorySessionStore, Transport};
use phase_bridge::url::ParameterMap;

use super::parse_assignments;

#[derive(Debug, Serialize)]
struct SimulationReport {
    scope_id: Option<String>,
    transport: Option<Transport>,
    redirect: Option<String>,
    render_parameters: ParameterMap,
    session_entries_after_action: usize,
    restored_attributes: AttributeMap,
    portlet_mode: PortletMode,
    view_id: Option<String>,
    view_error: Option<String>,
    session_entries_after_render: usize,
}

pub fn cmd_simulate(
    config: BridgeConfig,
    attrs: &[String],
    mode: Option<&str>,
    redirect: Option<&str>,
    transport: Option<&str>,
    json: bool,
) -> Result<()> {
    let config = match transport {
        Some(policy) => config.with_transport(policy.parse::<TransportPolicy>()?),
        None => config,
    };
    let attributes: Vec<(String, serde_json::Value)> = parse_assignments(attrs)?
        .into_iter()
        .map(|(name, raw)| {
            let value = serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));
            (name, value)
        })
        .collect();

    let coordinator = PhaseCoordinator::from_registry(&BridgeRegistry::from_config(config))?;
    let session = MemorySessionStore::new();

    let mut action = PhaseRequest::new(PhaseKind::Action);
    let mut action_response = PhaseResponse::new();
    let outcome = coordinator.execute(&mut action, &mut action_response, &session, |ctx| {
        for (name, value) in &attributes {
            ctx.set_attribute(name.clone(), value.clone());
        }
        if let Some(mode) = mode {
            ctx.set_portlet_mode(PortletMode::from(mode));
        }
        redirect.map(|url| ctx.redirect(url)).transpose()
    })?;
    let session_entries_after_action = session.len();

    let mut render = PhaseRequest::new(PhaseKind::Render)
        .with_parameters(&action_response.render_parameters)
        .with_portlet_mode(action_response.portlet_mode.clone().unwrap_or_default());
    let mut render_response = PhaseResponse::new();
    let mut report = coordinator.execute(&mut render, &mut render_response, &session, |ctx| {
        let scope = ctx.current_request_scope();
        let (view_id, view_error) = match ctx.resolve_view_id() {
            Ok(view_id) => (Some(view_id), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Ok(SimulationReport {
            scope_id: scope.map(|s| s.id().to_string()),
            transport: scope.map(|s| s.transport()),
            redirect: match &outcome {
                Some(RedirectOutcome::External(url)) => Some(url.clone()),
                Some(RedirectOutcome::Internal { view_id }) => Some(view_id.clone()),
                None => None,
            },
            render_parameters: action_response.render_parameters.clone(),
            session_entries_after_action,
            restored_attributes: ctx.request().attributes.clone(),
            portlet_mode: ctx.portlet_mode().clone(),
            view_id,
            view_error,
            session_entries_after_render: 0,
        })
    })?;
    report.session_entries_after_render = session.len();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!();
    println!("{}", console::style("Phase Bridge Simulation").bold().cyan());
    println!();

    match (&report.scope_id, report.transport) {
        (Some(id), Some(transport)) => {
            println!("  Scope:     {}", id);
            println!("  Transport: {}", console::style(transport).green());
        }
        _ => println!("  Scope:     {}", console::style("none").dim()),
    }
    if let Some(redirect) = &report.redirect {
        println!("  Redirect:  {}", redirect);
    }
    println!("  Mode:      {}", report.portlet_mode);
    println!(
        "  Session:   {} after action, {} after render",
        report.session_entries_after_action, report.session_entries_after_render
    );
    println!();

    println!("Render parameters:");
    if report.render_parameters.is_empty() {
        println!("  {}", console::style("(none)").dim());
    }
    for (name, values) in report.render_parameters.iter() {
        println!("  {} = {}", name, values.join(", "));
    }
    println!();

    println!("Restored attributes:");
    if report.restored_attributes.is_empty() {
        println!("  {}", console::style("(none)").dim());
    }
    for (name, value) in &report.restored_attributes {
        println!("  {} = {}", name, value);
    }
    println!();

    match (&report.view_id, &report.view_error) {
        (Some(view_id), _) => println!("View: {}", view_id),
        (None, Some(error)) => println!("{} {}", console::style("View error:").red().bold(), error),
        (None, None) => {}
    }
    println!();
}
