pub mod api;
pub mod core;

pub use api::{create_api_routes, AppState};
pub use self::core::RelayServer;
