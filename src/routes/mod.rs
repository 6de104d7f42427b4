pub mod api;
pub mod identity_middleware;
