//! URL handling: parameter maps, classification and phase-aware encoding.

pub mod classify;
pub mod encoder;
pub mod params;

pub use classify::{ClassifiedUrl, PORTLET_SCHEME, PORTLET_SCHEME_PREFIX, classify};
pub use encoder::{EncodedUrl, UrlEncoder, UrlKind};
pub use params::{ESCAPED_AMPERSAND, ParameterMap};
