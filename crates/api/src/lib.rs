//! HTTP surface for the texgen service.
//!
//! Thin axum handlers over the scheduling core: submission, status
//! polling, cancellation, usage statistics, and health. All state lives
//! in [`state::AppState`]; the router is built by [`router::build_app_router`]
//! so the binary and the integration tests share one middleware stack.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;
