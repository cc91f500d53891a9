//! Phase coordination.
//!
//! The `PhaseCoordinator` wraps one phase request: it restores the request
//! scope for Event/Render phases, hands the application a `PhaseContext`,
//! and releases the context afterwards (saving the scope after Action/Event,
//! evicting it after Render) whether or not the application succeeded.

mod context;

pub use context::{PhaseContext, RedirectOutcome};

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::errors::BridgeError;
use crate::host::{PhaseRequest, PhaseResponse};
use crate::registry::BridgeRegistry;
use crate::scope::SessionStore;
use crate::view::ViewResolver;

/// Render parameter naming the view an Action/Event phase navigated to.
pub const VIEW_ID_PARAM: &str = "_bridgeViewId";

/// Request attribute a host sets to select the view to render.
pub const VIEW_ID_ATTRIBUTE: &str = "bridge.viewId";

/// Request attribute a host sets to select the view by path.
pub const VIEW_PATH_ATTRIBUTE: &str = "bridge.viewPath";

/// Drives phases for one bridge instance. Shared by all requests.
#[derive(Clone)]
pub struct PhaseCoordinator {
    config: Arc<BridgeConfig>,
    views: Arc<dyn ViewResolver>,
}

impl PhaseCoordinator {
    pub fn new(config: Arc<BridgeConfig>, views: Arc<dyn ViewResolver>) -> Self {
        Self { config, views }
    }

    pub fn from_registry(registry: &BridgeRegistry) -> Result<Self, BridgeError> {
        Ok(Self::new(registry.config()?, registry.view_resolver()?))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Open a context for one phase request. Restores the scope for
    /// Event/Render phases.
    ///
    /// The context must be released with `PhaseContext::release`; dropping
    /// it unreleased releases it and logs any failure.
    pub fn begin<'a>(
        &'a self,
        request: &'a mut PhaseRequest,
        response: &'a mut PhaseResponse,
        session: &'a dyn SessionStore,
    ) -> Result<PhaseContext<'a>, BridgeError> {
        PhaseContext::open(&self.config, self.views.as_ref(), request, response, session)
    }

    /// Run `f` inside a phase context and release it afterwards.
    ///
    /// The context is released on success and on failure. When both `f`
    /// and the release fail, the error from `f` is returned and the release
    /// failure is logged.
    pub fn execute<T, F>(
        &self,
        request: &mut PhaseRequest,
        response: &mut PhaseResponse,
        session: &dyn SessionStore,
        f: F,
    ) -> Result<T, BridgeError>
    where
        F: FnOnce(&mut PhaseContext<'_>) -> Result<T, BridgeError>,
    {
        let phase = request.phase;
        let mut ctx = self.begin(request, response, session)?;
        let outcome = f(&mut ctx);
        let released = ctx.release();

        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), Ok(())) | (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(release_err)) => {
                tracing::warn!(
                    phase = %phase,
                    error = %release_err,
                    "failed to release phase context after phase error"
                );
                Err(e)
            }
        }
    }
}
