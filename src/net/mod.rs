//! Network layer.
//!
//! Plain TCP listeners are bound in `main`; this module only loads the
//! rustls configuration used when `listener.tls` is set.

pub mod tls;

pub use tls::load_tls_config;
