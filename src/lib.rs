pub mod config;
pub mod coordinator;
pub mod errors;
pub mod host;
pub mod phase;
pub mod registry;
pub mod scope;
pub mod url;
pub mod view;

pub use config::{BridgeConfig, BridgeToml, TransportPolicy};
pub use coordinator::{PhaseContext, PhaseCoordinator, RedirectOutcome};
pub use errors::{BridgeError, SessionError};
pub use host::{PhaseRequest, PhaseResponse};
pub use phase::{PhaseKind, PortletMode};
pub use registry::BridgeRegistry;
pub use scope::{MemorySessionStore, RequestScope, SessionStore, Transport};
