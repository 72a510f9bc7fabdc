//! API client for the market dashboard backend.
//!
//! Every call resolves to an [`ApiResponse`]; transport and HTTP failures are
//! folded into `Failure` here and never reach the caller as errors. A 401 from
//! any endpoint clears the shared [`Session`], unless the session has moved on
//! to a different token since the request went out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Session;
use crate::config::DEFAULT_API_BASE_URL;
use crate::models::user::UsersResponse;
use crate::models::market::LocationsResponse;
use crate::models::{
    ActiveListingPoint, AdminUser, Barometer, ChatReply, DomTrendPoint, HistoricalTrendPoint,
    MarketTables, MonthYearSeries, MonthsOfInventory, PricePerSqftPoint, SalesToListPoint,
    SalesVolumePoint, User, WeeklySeries,
};
use crate::scope::LatestSlot;

use super::error::{ADMIN_REQUIRED_MESSAGE, INVALID_RESPONSE_MESSAGE};
use super::{ApiError, ApiRequest, ApiResponse, ChartKind};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub max_rate_limit_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default base URL is valid"),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            max_rate_limit_retries: MAX_RATE_LIMIT_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SigninResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

/// A failed attempt: the classified error plus the raw error payload.
type Failed = (ApiError, Option<Value>);

/// API client for the dashboard backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    max_rate_limit_retries: u32,
    initial_backoff: Duration,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: Arc<Session>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
            max_rate_limit_retries: config.max_rate_limit_retries,
            initial_backoff: config.initial_backoff,
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ========================================================================
    // Gateway
    // ========================================================================

    /// Perform `request` and normalize the outcome.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResponse<T> {
        let start = Instant::now();
        let sent_token = self.session.token();
        let outcome = self.execute(&request, sent_token.as_deref()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let response = match outcome {
            Ok((status, body)) => {
                debug!(
                    method = %request.method,
                    path = %request.path,
                    status = status.as_u16(),
                    duration_ms,
                    "API request"
                );
                match decode::<T>(&body) {
                    Ok(data) => ApiResponse::success(data),
                    Err(e) => {
                        warn!(path = %request.path, error = %e, "Unexpected response shape");
                        ApiResponse::failure(ApiError::InvalidResponse(
                            INVALID_RESPONSE_MESSAGE.to_string(),
                        ))
                    }
                }
            }
            Err((error, errors)) => {
                debug!(
                    method = %request.method,
                    path = %request.path,
                    status = ?error.status(),
                    duration_ms,
                    error = %error,
                    "API request failed"
                );
                ApiResponse::failure_with(error, errors)
            }
        };

        if response.error().is_some_and(ApiError::is_unauthorized) {
            self.session
                .force_clear_if(sent_token.as_deref(), "backend rejected the token");
        }
        response
    }

    /// Like [`send`](Self::send), but resolves to a `Cancelled` failure as
    /// soon as `token` fires.
    pub async fn send_cancellable<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        token: &CancellationToken,
    ) -> ApiResponse<T> {
        let path = request.path.clone();
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(path = %path, "Request cancelled");
                ApiResponse::failure(ApiError::Cancelled)
            }
            response = self.send(request) => response,
        }
    }

    /// Load into `slot`, superseding any load already in flight. Returns
    /// whether the response was stored.
    pub async fn load_latest<T: DeserializeOwned>(
        &self,
        slot: &LatestSlot<ApiResponse<T>>,
        request: ApiRequest,
    ) -> bool {
        let ticket = slot.begin();
        let response = self.send_cancellable(request, ticket.token()).await;
        slot.fulfil(ticket, response)
    }

    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", path, e)))
    }

    /// Send with 429 retries, authorized with `token` on every attempt.
    /// Returns the status and body of a 2xx response.
    async fn execute(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<(StatusCode, String), Failed> {
        let url = self.url_for(&request.path).map_err(|e| (e, None))?;
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let mut builder = self.client.request(request.method.clone(), url.clone());
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }
            if let Some(token) = token {
                builder = builder.bearer_auth(token);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| {
                    warn!(path = %request.path, error = %e, "Request failed to send");
                    (ApiError::network(&e), None)
                })?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS && retries < self.max_rate_limit_retries {
                retries += 1;
                warn!(
                    path = %request.path,
                    retry = retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                continue;
            }

            let body = response
                .text()
                .await
                .map_err(|e| (ApiError::network(&e), None))?;

            if status.is_success() {
                return Ok((status, body));
            }
            return Err(ApiError::from_status(status, &body));
        }
    }

    // ========================================================================
    // Market data
    // ========================================================================

    pub async fn cities(&self) -> ApiResponse<Vec<String>> {
        self.send::<LocationsResponse>(ApiRequest::get("ALL-Cities"))
            .await
            .map(|r| r.locations)
    }

    pub async fn barometer(&self, city: &str) -> ApiResponse<Barometer> {
        self.send(ChartKind::Barometer.request(city)).await
    }

    pub async fn historical_trend(&self, city: &str) -> ApiResponse<Vec<HistoricalTrendPoint>> {
        self.send(ChartKind::HistoricalTrend.request(city)).await
    }

    pub async fn median_sales(&self, city: &str) -> ApiResponse<MonthYearSeries> {
        self.send(ChartKind::MedianSales.request(city)).await
    }

    pub async fn dom_trend(&self, city: &str) -> ApiResponse<Vec<DomTrendPoint>> {
        self.send(ChartKind::DomTrend.request(city)).await
    }

    pub async fn sales_volume(&self, city: &str) -> ApiResponse<Vec<SalesVolumePoint>> {
        self.send(ChartKind::SalesVolume.request(city)).await
    }

    pub async fn active_listings(&self, city: &str) -> ApiResponse<Vec<ActiveListingPoint>> {
        self.send(ChartKind::ActiveListings.request(city)).await
    }

    pub async fn weekly_pending(&self, city: &str) -> ApiResponse<WeeklySeries> {
        self.send(ChartKind::WeeklyPending.request(city)).await
    }

    pub async fn weekly_price_reductions(&self, city: &str) -> ApiResponse<WeeklySeries> {
        self.send(ChartKind::WeeklyPriceReductions.request(city)).await
    }

    pub async fn sales_to_list_ratio(&self, city: &str) -> ApiResponse<Vec<SalesToListPoint>> {
        self.send(ChartKind::SalesToListRatio.request(city)).await
    }

    pub async fn months_of_inventory(&self, city: &str) -> ApiResponse<MonthYearSeries> {
        self.send::<MonthsOfInventory>(ChartKind::MonthsOfInventory.request(city))
            .await
            .map(|moi| moi.data)
    }

    pub async fn price_per_sqft(&self, city: &str) -> ApiResponse<Vec<PricePerSqftPoint>> {
        self.send(ChartKind::PricePerSqft.request(city)).await
    }

    /// Any chart payload as untyped JSON.
    pub async fn chart_raw(&self, kind: ChartKind, city: &str) -> ApiResponse<Value> {
        self.send(kind.request(city)).await
    }

    /// Price-range tables for a city and month. `month` is 1-12.
    pub async fn tables(&self, city: &str, year: i32, month: u32) -> ApiResponse<MarketTables> {
        let request = ApiRequest::get("get-tables")
            .query("city", city)
            .query("year", year)
            .query("month", month);
        self.send(request).await
    }

    pub async fn chat(&self, query: &str) -> ApiResponse<ChatReply> {
        self.send(ApiRequest::get("Chat-bot").query("query", query))
            .await
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    pub async fn signup(&self, full_name: &str, email: &str, password: &str) -> ApiResponse<Value> {
        let body = json!({
            "user_full_name": full_name,
            "user_email": email,
            "user_password": password,
        });
        self.send(ApiRequest::post("auth/signup", body)).await
    }

    /// Sign in and start a session on success.
    pub async fn signin(&self, email: &str, password: &str) -> ApiResponse<User> {
        let body = json!({ "email": email, "password": password });
        let response = self
            .send::<SigninResponse>(ApiRequest::post("auth/signin", body))
            .await;

        match response {
            ApiResponse::Success { data, message } => match (data.access_token, data.user) {
                (Some(token), Some(user)) if !token.is_empty() => {
                    self.session.login(token, user.clone());
                    ApiResponse::Success {
                        data: user,
                        message,
                    }
                }
                _ => {
                    warn!("Sign-in response missing token or user");
                    ApiResponse::failure(ApiError::InvalidResponse(
                        INVALID_RESPONSE_MESSAGE.to_string(),
                    ))
                }
            },
            ApiResponse::Failure {
                error,
                message,
                errors,
            } => ApiResponse::Failure {
                error,
                message,
                errors,
            },
        }
    }

    /// Activate an account with the token from the verification email.
    pub async fn activate(&self, token: &str) -> ApiResponse<Value> {
        self.send(ApiRequest::get("auth/activate").query("token", token))
            .await
    }

    /// All accounts. Admin only; refused locally for other sessions.
    pub async fn users(&self) -> ApiResponse<Vec<AdminUser>> {
        if !self.session.is_admin() {
            debug!("User listing refused for non-admin session");
            return ApiResponse::failure(ApiError::AccessDenied(ADMIN_REQUIRED_MESSAGE.to_string()));
        }
        self.send::<UsersResponse>(ApiRequest::get("users"))
            .await
            .map(|r| r.users)
    }
}

/// Parse a success body. An empty body decodes as JSON `null`.
fn decode<T: DeserializeOwned>(body: &str) -> serde_json::Result<T> {
    if body.trim().is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_str(body)
    }
}
