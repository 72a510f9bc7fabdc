//! REST API client module for the market dashboard backend.
//!
//! This module provides the `ApiClient` gateway and the uniform
//! `ApiResponse` every call resolves to. Authenticated requests carry the
//! bearer token from the shared `Session`.

pub mod client;
pub mod error;
pub mod request;
pub mod response;

pub use client::{ApiClient, ClientConfig};
pub use error::ApiError;
pub use request::{ApiRequest, ChartKind};
pub use reqwest::Method;
pub use response::{ApiResponse, SUCCESS_MESSAGE};
