//! Data models for pushrelay

pub mod action;
pub mod configuration;
pub mod dispatch;
pub mod intent;
pub mod request;
pub mod target;

pub use action::*;
pub use configuration::*;
pub use dispatch::*;
pub use intent::*;
pub use request::*;
pub use target::*;
