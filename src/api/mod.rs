//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! All endpoints live under `/api/v1` and are documented with `utoipa`
//! annotations; the OpenAPI document is served at `/docs` when the server is
//! running.

pub mod handlers;
pub mod models;
