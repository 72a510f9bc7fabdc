use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde_json::Value;

/// A request against the backend, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).body(body)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// The per-city chart endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Barometer,
    HistoricalTrend,
    MedianSales,
    DomTrend,
    SalesVolume,
    ActiveListings,
    WeeklyPending,
    WeeklyPriceReductions,
    SalesToListRatio,
    MonthsOfInventory,
    PricePerSqft,
}

impl ChartKind {
    pub const ALL: [ChartKind; 11] = [
        ChartKind::Barometer,
        ChartKind::HistoricalTrend,
        ChartKind::MedianSales,
        ChartKind::DomTrend,
        ChartKind::SalesVolume,
        ChartKind::ActiveListings,
        ChartKind::WeeklyPending,
        ChartKind::WeeklyPriceReductions,
        ChartKind::SalesToListRatio,
        ChartKind::MonthsOfInventory,
        ChartKind::PricePerSqft,
    ];

    /// Endpoint path relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            ChartKind::Barometer => "GET-Barometer",
            ChartKind::HistoricalTrend => "historical-trend-11",
            ChartKind::MedianSales => "median-sales-1",
            ChartKind::DomTrend => "dom-trend-2",
            ChartKind::SalesVolume => "sales-volume-3",
            ChartKind::ActiveListings => "get-active-listing-7",
            ChartKind::WeeklyPending => "weekly-pending-4",
            ChartKind::WeeklyPriceReductions => "weekly-price-reductions-5",
            ChartKind::SalesToListRatio => "sale-list-ratio-8",
            ChartKind::MonthsOfInventory => "moi-6",
            ChartKind::PricePerSqft => "price-sqft-9",
        }
    }

    /// Short name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Barometer => "barometer",
            ChartKind::HistoricalTrend => "historical-trend",
            ChartKind::MedianSales => "median-sales",
            ChartKind::DomTrend => "dom-trend",
            ChartKind::SalesVolume => "sales-volume",
            ChartKind::ActiveListings => "active-listings",
            ChartKind::WeeklyPending => "weekly-pending",
            ChartKind::WeeklyPriceReductions => "weekly-price-reductions",
            ChartKind::SalesToListRatio => "sales-to-list",
            ChartKind::MonthsOfInventory => "months-of-inventory",
            ChartKind::PricePerSqft => "price-per-sqft",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::Barometer => "Market Barometer",
            ChartKind::HistoricalTrend => "Historical Trend",
            ChartKind::MedianSales => "Median Sales Price",
            ChartKind::DomTrend => "Days on Market Trend",
            ChartKind::SalesVolume => "Sales Volume",
            ChartKind::ActiveListings => "Active Listings",
            ChartKind::WeeklyPending => "Weekly Pending Sales",
            ChartKind::WeeklyPriceReductions => "Weekly Price Reductions",
            ChartKind::SalesToListRatio => "Sales to List Price Ratio",
            ChartKind::MonthsOfInventory => "Months of Inventory",
            ChartKind::PricePerSqft => "Price per Square Foot",
        }
    }

    pub fn request(&self, city: &str) -> ApiRequest {
        ApiRequest::get(self.path()).query("city", city)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ChartKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == wanted || k.path().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = ChartKind::ALL.iter().map(ChartKind::name).collect();
                format!("unknown chart {:?} (expected one of: {})", s, names.join(", "))
            })
    }
}
