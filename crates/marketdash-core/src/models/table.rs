//! Price-range market tables (single-family and condo).
//!
//! The `get-tables` endpoint has shipped several generations of column names,
//! so each raw row is normalized into a [`PriceRangeRow`] before display and
//! the rows are ordered by the floor of their price band.

use std::fmt;
use std::io;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column headers used for CSV export.
pub const CSV_HEADERS: [&str; 12] = [
    "Price Range",
    "Pending/Signed Contract",
    "Price Adjustments",
    "Sold and Closed",
    "New Listings",
    "DOM",
    "List to Close +/-",
    "Total Actives",
    "Last Month",
    "Last Quarter",
    "Last Year",
    "Trending",
];

const DEFAULT_TREND: &str = "→";
const UNKNOWN_RANGE: &str = "Unknown";

/// A lookback figure: the backend sends either a count or a preformatted
/// change such as `"+12%"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lookback {
    Number(f64),
    Text(String),
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookback::Number(n) => write!(f, "{}", n),
            Lookback::Text(s) => f.write_str(s),
        }
    }
}

/// A normalized table row for one price band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRangeRow {
    pub price_range: String,
    pub pending: f64,
    pub price_adjustments: f64,
    pub sold: f64,
    pub new_listings: f64,
    pub dom: f64,
    pub list_to_close: f64,
    pub total_actives: f64,
    pub last_month: Option<Lookback>,
    pub last_quarter: Option<Lookback>,
    pub last_year: Option<Lookback>,
    pub trending: String,
}

fn number_field(raw: &Map<String, Value>, key: &str) -> Option<f64> {
    match raw.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_field<'a>(raw: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    raw.get(key)?.as_str().filter(|s| !s.is_empty())
}

fn lookback_field(raw: &Map<String, Value>, keys: &[&str]) -> Option<Lookback> {
    keys.iter().find_map(|key| match raw.get(*key)? {
        Value::Number(n) => n.as_f64().map(Lookback::Number),
        Value::String(s) => Some(Lookback::Text(s.clone())),
        _ => None,
    })
}

/// Lookback column names in lookup order. Condo rows check the title-case
/// columns first, single-family rows the upper-case ones.
fn lookback_keys(kind: PropertyKind) -> [[&'static str; 3]; 3] {
    match kind {
        PropertyKind::SingleFamily => [
            ["LAST MONTH", "Last Month", "Change from Last Month"],
            ["LAST QUARTER", "Last Quarter", "Previous 3 Months Change"],
            ["LAST YEAR", "Last Year", "Previous 12 Months"],
        ],
        PropertyKind::Condo => [
            ["Last Month", "LAST MONTH", "Change from Last Month"],
            ["Last Quarter", "LAST QUARTER", "Previous 3 Months Change"],
            ["Last Year", "LAST YEAR", "Previous 12 Months"],
        ],
    }
}

impl PriceRangeRow {
    /// Normalize a raw backend row of the `kind` table, applying the column
    /// fallbacks.
    pub fn from_raw(raw: &Map<String, Value>, kind: PropertyKind) -> Self {
        let [month_keys, quarter_keys, year_keys] = lookback_keys(kind);
        let price_range = text_field(raw, "pricerange")
            .map(str::to_string)
            .or_else(|| match raw.get("index") {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| UNKNOWN_RANGE.to_string());

        let price_adjustments = number_field(raw, "Price Adjustments").unwrap_or_else(|| {
            number_field(raw, "Price Increased").unwrap_or(0.0)
                + number_field(raw, "Price Decreased").unwrap_or(0.0)
        });

        Self {
            price_range,
            pending: number_field(raw, "Pending/ Signed Contract").unwrap_or(0.0),
            price_adjustments,
            sold: number_field(raw, "Sold and Closed").unwrap_or(0.0),
            new_listings: number_field(raw, "New Listings").unwrap_or(0.0),
            dom: number_field(raw, "DOM").unwrap_or(0.0),
            list_to_close: number_field(raw, "List to Close +/-").unwrap_or(0.0),
            total_actives: number_field(raw, "Total Actives").unwrap_or(0.0),
            last_month: lookback_field(raw, &month_keys),
            last_quarter: lookback_field(raw, &quarter_keys),
            last_year: lookback_field(raw, &year_keys),
            trending: text_field(raw, "Trending < >")
                .unwrap_or(DEFAULT_TREND)
                .to_string(),
        }
    }

    /// Lower bound of the price band in dollars, used for ordering.
    pub fn price_floor(&self) -> u64 {
        price_floor(&self.price_range)
    }

    fn csv_record(&self) -> [String; 12] {
        let lookback = |l: &Option<Lookback>| l.as_ref().map(|v| v.to_string()).unwrap_or_default();
        [
            self.price_range.clone(),
            self.pending.to_string(),
            self.price_adjustments.to_string(),
            self.sold.to_string(),
            self.new_listings.to_string(),
            self.dom.to_string(),
            self.list_to_close.to_string(),
            self.total_actives.to_string(),
            lookback(&self.last_month),
            lookback(&self.last_quarter),
            lookback(&self.last_year),
            self.trending.clone(),
        ]
    }
}

fn million_plus_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)M\+").expect("valid regex"))
}

fn million_band_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)–(\d+)M").expect("valid regex"))
}

fn dollar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$?([\d,]+)").expect("valid regex"))
}

/// Parse the lower bound of a price band label.
///
/// Understands `"5M+"`, `"1–2M"` (en dash) and `"$100,000"` style labels;
/// anything else sorts first as 0.
pub fn price_floor(label: &str) -> u64 {
    let millions = |digits: &str| digits.parse::<u64>().map(|n| n * 1_000_000).unwrap_or(0);

    if label.contains("M+") {
        million_plus_re()
            .captures(label)
            .map(|c| millions(&c[1]))
            .unwrap_or(0)
    } else if label.contains('–') {
        million_band_re()
            .captures(label)
            .map(|c| millions(&c[1]))
            .unwrap_or(0)
    } else {
        dollar_re()
            .captures(label)
            .and_then(|c| c[1].replace(',', "").parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawTables {
    #[serde(default)]
    sf: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    condo: Option<Vec<Map<String, Value>>>,
}

/// Single-family and condo tables for one city and month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketTables {
    pub sf: Vec<PriceRangeRow>,
    pub condo: Vec<PriceRangeRow>,
}

fn normalize_rows(raw: Option<Vec<Map<String, Value>>>, kind: PropertyKind) -> Vec<PriceRangeRow> {
    let mut rows: Vec<PriceRangeRow> = raw
        .unwrap_or_default()
        .iter()
        .map(|r| PriceRangeRow::from_raw(r, kind))
        .collect();
    rows.sort_by_key(PriceRangeRow::price_floor);
    rows
}

impl<'de> Deserialize<'de> for MarketTables {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawTables::deserialize(deserializer)?;
        Ok(Self {
            sf: normalize_rows(raw.sf, PropertyKind::SingleFamily),
            condo: normalize_rows(raw.condo, PropertyKind::Condo),
        })
    }
}

/// Property type selector for the market tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    SingleFamily,
    Condo,
}

impl PropertyKind {
    pub fn title(&self) -> &'static str {
        match self {
            PropertyKind::SingleFamily => "Single Family",
            PropertyKind::Condo => "Condo",
        }
    }
}

impl MarketTables {
    pub fn rows(&self, kind: PropertyKind) -> &[PriceRangeRow] {
        match kind {
            PropertyKind::SingleFamily => &self.sf,
            PropertyKind::Condo => &self.condo,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sf.is_empty() && self.condo.is_empty()
    }
}

/// Write rows as CSV with the dashboard's export headers.
pub fn write_csv<W: io::Write>(rows: &[PriceRangeRow], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADERS)?;
    for row in rows {
        wtr.write_record(row.csv_record())?;
    }
    wtr.flush()?;
    Ok(())
}
