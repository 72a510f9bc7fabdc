//! Command handlers.
//!
//! Every handler resolves to an [`Outcome`], which `main` turns into the
//! process exit code.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use marketdash_core::api::error::VALIDATION_MESSAGE;
use marketdash_core::config::resolve_base_url;
use marketdash_core::models::{
    write_csv, PropertyKind, Role, UserFilter, UserSort, VerificationFilter,
};
use marketdash_core::stats::YearFilter;
use marketdash_core::utils::month_number;
use marketdash_core::validation::{validate_sign_in, validate_sign_up, ValidationErrors};
use marketdash_core::{ApiClient, ApiError, ApiResponse, ChartKind, Config, Session};

use crate::render;
use crate::{ChartMetric, TableKind};

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The backend call failed.
    Failed,
    /// Input was rejected before anything was sent.
    Rejected,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Done => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::from(1),
            Outcome::Rejected => ExitCode::from(2),
        }
    }
}

const CHAT_SIGN_IN_REQUIRED: &str =
    "You need to be logged in to use the chatbot. Please sign in to your account first.";

pub struct App {
    config: Config,
    session: Arc<Session>,
    api: ApiClient,
    json: bool,
}

impl App {
    pub fn new(base_url_override: Option<&str>, json: bool) -> Result<Self> {
        let config = Config::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        });

        let mut client_config = config.client_config()?;
        if let Some(url) = base_url_override {
            client_config.base_url = resolve_base_url(Some(url), None)?;
        }

        let session = Arc::new(Session::open(config.open_storage()?));
        let api = ApiClient::new(client_config, session.clone())?;

        Ok(Self {
            config,
            session,
            api,
            json,
        })
    }

    pub fn base_url(&self) -> &Url {
        self.api.base_url()
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    pub async fn signin(&mut self, email: Option<String>, password: Option<String>) -> Result<Outcome> {
        let email = match email {
            Some(e) => e,
            None => prompt_line("Email", self.config.last_email.as_deref())?,
        };
        let password = match password {
            Some(p) => p,
            None => rpassword::prompt_password("Password: ")?,
        };

        let errors = validate_sign_in(&email, &password);
        if !errors.is_empty() {
            return self.rejected(&errors);
        }

        let response = self.api.signin(email.trim(), &password).await;
        if response.is_success() {
            self.config.last_email = Some(email.trim().to_string());
            self.save_config();
        }
        self.report(response, |user| {
            println!("Welcome back, {}!", user.full_name);
            println!("You have successfully signed in.");
        })
    }

    pub async fn signup(
        &mut self,
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<Outcome> {
        let name = match name {
            Some(n) => n,
            None => prompt_line("Full name", None)?,
        };
        let email = match email {
            Some(e) => e,
            None => prompt_line("Email", None)?,
        };
        let (password, confirm) = match password {
            Some(p) => (p.clone(), p),
            None => (
                rpassword::prompt_password("Password: ")?,
                rpassword::prompt_password("Confirm password: ")?,
            ),
        };

        let errors = validate_sign_up(&name, &email, &password, &confirm);
        if !errors.is_empty() {
            return self.rejected(&errors);
        }

        let response = self
            .api
            .signup(name.trim(), email.trim(), &password)
            .await;
        if response.is_success() {
            self.config.last_email = Some(email.trim().to_string());
            self.save_config();
        }
        self.report(response, |_| {
            println!("Account created successfully. Visit your email to verify your account.");
        })
    }

    pub async fn activate(&self, token: &str) -> Result<Outcome> {
        let response = self.api.activate(token.trim()).await;
        self.report(response, |_| {
            println!("Account verified successfully! Your account is now active and ready to use.");
        })
    }

    pub fn logout(&self) -> Result<Outcome> {
        let was_signed_in = self.session.is_authenticated();
        self.session.logout();
        if self.json {
            print_json(&ApiResponse::success(json!({ "signedOut": was_signed_in })))?;
        } else if was_signed_in {
            println!("Signed out.");
        } else {
            println!("Not signed in.");
        }
        Ok(Outcome::Done)
    }

    pub fn whoami(&self) -> Result<Outcome> {
        let user = self.session.user();
        if self.json {
            print_json(&ApiResponse::success(user))?;
            return Ok(Outcome::Done);
        }
        match user {
            Some(user) => render::user_profile(&user),
            None => println!("Not signed in."),
        }
        Ok(Outcome::Done)
    }

    // ========================================================================
    // Market data
    // ========================================================================

    pub async fn cities(&self) -> Result<Outcome> {
        let response = self.api.cities().await;
        self.report(response, |cities| render::cities(cities))
    }

    pub async fn chart(
        &mut self,
        kind: ChartKind,
        city: Option<String>,
        year: YearFilter,
        metric: Option<ChartMetric>,
        raw: bool,
    ) -> Result<Outcome> {
        let supported = ChartMetric::supported(kind);
        let metric = metric.unwrap_or(supported[0]);
        if !supported.contains(&metric) {
            let names: Vec<&str> = supported.iter().map(ChartMetric::name).collect();
            anyhow::bail!(
                "{} has no {} metric (available: {})",
                kind.title(),
                metric.name(),
                names.join(", ")
            );
        }
        let city = self.city(city)?;
        let api = &self.api;

        let outcome = if raw {
            let response = api.chart_raw(kind, &city).await;
            self.report(response, |value| {
                println!("{}", serde_json::to_string_pretty(value).unwrap_or_default())
            })?
        } else {
            match kind {
                ChartKind::Barometer => {
                    let response = api.barometer(&city).await;
                    self.report(response, |b| render::barometer(&city, b))?
                }
                ChartKind::HistoricalTrend => {
                    let response = api.historical_trend(&city).await;
                    self.report(response, |p| render::historical_trend(&city, p, year))?
                }
                ChartKind::MedianSales => {
                    let response = api.median_sales(&city).await;
                    self.report(response, |s| render::month_year(kind, &city, s, year))?
                }
                ChartKind::MonthsOfInventory => {
                    let response = api.months_of_inventory(&city).await;
                    self.report(response, |s| render::month_year(kind, &city, s, year))?
                }
                ChartKind::DomTrend => {
                    let response = api.dom_trend(&city).await;
                    self.report(response, |p| match metric {
                        ChartMetric::Listings => {
                            render::monthly(kind, &city, p, year, |pt| pt.month, |pt| pt.listings, render::count)
                        }
                        _ => render::monthly(kind, &city, p, year, |pt| pt.month, |pt| pt.mediandom, render::days),
                    })?
                }
                ChartKind::SalesVolume => {
                    let response = api.sales_volume(&city).await;
                    self.report(response, |p| {
                        render::monthly(kind, &city, p, year, |pt| pt.month, |pt| pt.salesvolume, render::count)
                    })?
                }
                ChartKind::ActiveListings => {
                    let response = api.active_listings(&city).await;
                    self.report(response, |p| {
                        render::monthly(kind, &city, p, year, |pt| pt.month, |pt| pt.active_listings, render::count)
                    })?
                }
                ChartKind::SalesToListRatio => {
                    let response = api.sales_to_list_ratio(&city).await;
                    self.report(response, |p| {
                        render::monthly(kind, &city, p, year, |pt| pt.month, |pt| pt.slpr, render::ratio)
                    })?
                }
                ChartKind::PricePerSqft => {
                    let response = api.price_per_sqft(&city).await;
                    self.report(response, |p| match metric {
                        ChartMetric::Average => render::monthly(
                            kind,
                            &city,
                            p,
                            year,
                            |pt| pt.month,
                            |pt| pt.average_ppsf,
                            render::currency,
                        ),
                        _ => render::monthly(kind, &city, p, year, |pt| pt.month, |pt| pt.median_ppsf, render::currency),
                    })?
                }
                ChartKind::WeeklyPending => {
                    let response = api.weekly_pending(&city).await;
                    self.report(response, |w| render::weekly(kind, &city, w, year))?
                }
                ChartKind::WeeklyPriceReductions => {
                    let response = api.weekly_price_reductions(&city).await;
                    self.report(response, |w| render::weekly(kind, &city, w, year))?
                }
            }
        };

        self.remember_city(&city, outcome);
        Ok(outcome)
    }

    pub async fn tables(
        &mut self,
        city: Option<String>,
        year: Option<i32>,
        month: Option<String>,
        kind: TableKind,
        csv: Option<Option<PathBuf>>,
    ) -> Result<Outcome> {
        let city = self.city(city)?;
        let today = Local::now().date_naive();
        let year = year.unwrap_or_else(|| today.year());
        let month = match month {
            Some(m) => month_number(&m)
                .ok_or_else(|| anyhow::anyhow!("Invalid month {:?}: use 1-12 or Jan-Dec", m))?,
            None => today.month(),
        };

        let kinds: &[PropertyKind] = match kind {
            TableKind::Sf => &[PropertyKind::SingleFamily],
            TableKind::Condo => &[PropertyKind::Condo],
            TableKind::All => &[PropertyKind::SingleFamily, PropertyKind::Condo],
        };
        if csv.is_some() && kinds.len() != 1 {
            anyhow::bail!("Choose --kind sf or --kind condo for CSV export");
        }

        let response = self.api.tables(&city, year, month).await;

        if let (Some(path), Some(tables)) = (csv, response.data()) {
            let path = path.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "property-market-data-{}.csv",
                    today.format("%Y-%m-%d")
                ))
            });
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_csv(tables.rows(kinds[0]), file)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Exported table");
            if !self.json {
                println!("Exported {} rows to {}", tables.rows(kinds[0]).len(), path.display());
            }
        }

        let outcome = self.report(response, |tables| {
            render::tables(&city, year, month, tables, kinds)
        })?;
        self.remember_city(&city, outcome);
        Ok(outcome)
    }

    pub async fn chat(&self, query: &str) -> Result<Outcome> {
        if query.trim().is_empty() {
            anyhow::bail!("Ask a question, e.g. marketdash chat \"How is the Austin market?\"");
        }
        if !self.session.is_authenticated() {
            return self.report::<()>(
                ApiResponse::failure(ApiError::Unauthorized(CHAT_SIGN_IN_REQUIRED.to_string())),
                |_| {},
            );
        }
        let response = self.api.chat(query.trim()).await;
        self.report(response, |reply| println!("{}", reply.text()))
    }

    pub async fn users(
        &self,
        search: Option<String>,
        role: Option<String>,
        verified: bool,
        unverified: bool,
        sort: UserSort,
    ) -> Result<Outcome> {
        let filter = UserFilter {
            search,
            role: role.map(|r| Role::from(r.trim().to_lowercase())),
            verification: if verified {
                VerificationFilter::Verified
            } else if unverified {
                VerificationFilter::Unverified
            } else {
                VerificationFilter::All
            },
            sort,
        };

        let response = self.api.users().await;
        let response = response.map(|users| filter.apply(&users).into_iter().cloned().collect::<Vec<_>>());
        self.report(response, |users| render::users(users))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Print a result: the envelope in JSON mode, otherwise `render` on
    /// success and the message on failure.
    fn report<T: Serialize>(&self, response: ApiResponse<T>, render: impl FnOnce(&T)) -> Result<Outcome> {
        let outcome = if response.is_success() {
            Outcome::Done
        } else {
            Outcome::Failed
        };
        if self.json {
            print_json(&response)?;
            return Ok(outcome);
        }
        match response {
            ApiResponse::Success { data, .. } => render(&data),
            ApiResponse::Failure { error, message, .. } => {
                eprintln!("Error: {}", message);
                if error.is_unauthorized() && !self.session.is_authenticated() {
                    eprintln!("Run `marketdash signin` to sign in.");
                }
            }
        }
        Ok(outcome)
    }

    fn rejected(&self, errors: &ValidationErrors) -> Result<Outcome> {
        if self.json {
            let response: ApiResponse<()> = ApiResponse::failure_with(
                ApiError::Validation(VALIDATION_MESSAGE.to_string()),
                Some(serde_json::to_value(errors)?),
            );
            print_json(&response)?;
        } else {
            for message in errors.messages() {
                eprintln!("{}", message);
            }
        }
        Ok(Outcome::Rejected)
    }

    fn city(&self, city: Option<String>) -> Result<String> {
        city.or_else(|| self.config.last_city.clone())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| anyhow::anyhow!("No city given; pass --city (see `marketdash cities`)"))
    }

    fn remember_city(&mut self, city: &str, outcome: Outcome) {
        if outcome == Outcome::Done && self.config.last_city.as_deref() != Some(city) {
            self.config.last_city = Some(city.to_string());
            self.save_config();
        }
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn prompt_line(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let line = line.trim();
    Ok(match (line.is_empty(), default) {
        (true, Some(d)) => d.to_string(),
        _ => line.to_string(),
    })
}
