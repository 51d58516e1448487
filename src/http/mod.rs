//! HTTP server components including handlers, middleware, and routing.

pub mod context;
pub mod handler_counter;
pub mod handler_device;
pub mod handler_index;
pub mod handler_oauth;
pub mod middleware_auth;
pub mod server;
pub mod utils_cookies;

pub use context::AppState;
pub use middleware_auth::{CurrentUser, is_public_path};
pub use server::build_router;
