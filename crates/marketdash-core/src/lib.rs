//! Core library for the real-estate market dashboard client.
//!
//! - `auth`: the session (token + user) and its persistence
//! - `api`: the HTTP gateway and per-endpoint methods
//! - `models`: payload types for charts, tables and accounts
//! - `stats`: client-side aggregation over chart series
//! - `scope`: request cancellation and latest-wins result slots
//! - `validation`: sign-in and sign-up form checks
//! - `config`: configuration file and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod scope;
pub mod stats;
pub mod utils;
pub mod validation;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse, ChartKind, ClientConfig};
pub use auth::{AuthState, Session, SessionStorage};
pub use config::Config;
pub use scope::{LatestSlot, RequestScope};
