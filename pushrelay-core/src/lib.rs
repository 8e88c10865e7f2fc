//! # Pushrelay Core Library
//!
//! Vendor-neutral push notification dispatch: target registration, notification composition,
//! provider relay, and the device-side delivery surfaces that interpret actions.

pub mod client;
pub mod composer;
pub mod error;
pub mod models;
pub mod providers;
pub mod registry;
pub mod relay;
pub mod server;
pub mod services;
pub mod surface;

pub use composer::Composer;
pub use error::{ErrorKind, ProviderFault, RelayError};
pub use registry::{ConsentGate, PermissionState, TargetRegistry};
pub use relay::DispatchRelay;
