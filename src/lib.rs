//! # filmregal
//!
//! Backend of a movie and actor catalog: movies, actors, the cast links between
//! them and per-movie ratings, served as a JSON REST API.
//!
//! ## Architecture
//!
//! - **Axum** for routing and middleware
//! - **SQLx** with SQLite for persistence
//! - **Tokio** as the async runtime
//! - **Serde** for the camelCase JSON payloads
//!
//! ## Core Components
//!
//! - [`featured`]: the featured-item selector behind `/movies/recent` and `/actors/recent`
//! - [`catalog`]: queries and mutations for movies, actors, ratings and search,
//!   plus the TMDB import
//! - [`tmdb`]: HTTP client for the TMDB API
//! - [`routes`]: HTTP handlers and the router
//! - [`middleware`]: API-key guard, rate limiting, request validation, security headers
//! - [`config`]: layered configuration (embedded defaults, files, environment)
//! - [`db`]: schema initialization
//! - [`error`]: the [`error::AppError`] type and its JSON responses
//! - [`metrics`]: counters exposed as JSON and Prometheus text
//! - [`state`]: shared handler state
//! - [`types`]: entities and request/response DTOs

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod featured;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod tmdb;
pub mod types;

#[cfg(test)]
mod tests;
