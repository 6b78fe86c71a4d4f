//! API Module
//!
//! HTTP handlers and routing for the demo service built on cached calls.
//!
//! # Endpoints
//! - `GET /users/:id` - Cached user profile (60s)
//! - `GET /calc?x=&y=` - Cached power calculation (300s)
//! - `POST /cache/clear` - Clear by namespace, key, or everything
//! - `GET /stats` - Cache statistics of the active manager
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
