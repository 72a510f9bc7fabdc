//! Chart payload models.
//!
//! One type per chart endpoint. Field names follow the backend's JSON exactly
//! (it mixes `snake_case`, `lowercase` and `PascalCase` between endpoints), so
//! deserializing a payload is also the schema check for that endpoint.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::stats::{Dated, SeriesSummary};
use crate::utils::month_number;

// ============================================================================
// Barometer
// ============================================================================

/// Market barometer snapshot for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "PascalCase")]
pub struct Barometer {
    pub barometer_index: f64,
    pub active_listings: f64,
    pub new_listings: f64,
    pub pending_sales: f64,
    pub closed_sales: f64,
}

/// Market health bucket derived from the barometer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketHealth {
    Hot,
    Strong,
    Balanced,
    BuyersMarket,
    Cold,
}

impl MarketHealth {
    pub fn from_index(index: f64) -> Self {
        if index >= 0.8 {
            MarketHealth::Hot
        } else if index >= 0.6 {
            MarketHealth::Strong
        } else if index >= 0.4 {
            MarketHealth::Balanced
        } else if index >= 0.2 {
            MarketHealth::BuyersMarket
        } else {
            MarketHealth::Cold
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarketHealth::Hot => "Hot Market",
            MarketHealth::Strong => "Strong Market",
            MarketHealth::Balanced => "Balanced Market",
            MarketHealth::BuyersMarket => "Buyer's Market",
            MarketHealth::Cold => "Cold Market",
        }
    }
}

impl Barometer {
    pub fn health(&self) -> MarketHealth {
        MarketHealth::from_index(self.barometer_index)
    }

    /// Index as a rounded percentage (0-100).
    pub fn percentage(&self) -> i64 {
        (self.barometer_index * 100.0).round() as i64
    }

    /// Estimated days on market from annualized closings.
    pub fn estimated_days_on_market(&self) -> Option<i64> {
        if self.closed_sales == 0.0 {
            return None;
        }
        Some((365.0 / (self.closed_sales / 12.0)).round() as i64)
    }

    pub fn months_of_inventory(&self) -> Option<i64> {
        if self.closed_sales == 0.0 {
            return None;
        }
        Some((self.active_listings / self.closed_sales * 12.0).round() as i64)
    }

    /// Closings as a percentage of active listings.
    pub fn absorption_rate(&self) -> Option<i64> {
        if self.active_listings == 0.0 {
            return None;
        }
        Some((self.closed_sales / self.active_listings * 100.0).round() as i64)
    }
}

// ============================================================================
// Monthly point series
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct HistoricalTrendPoint {
    pub year: i32,
    /// Month start date as sent by the backend (e.g. `2024-03-01`).
    pub month: String,
    pub sales_volume: f64,
    pub avg_price: f64,
    pub median_price: f64,
    pub avg_ppsf: f64,
    pub avg_dom: f64,
}

impl HistoricalTrendPoint {
    /// Sales volume times average price.
    pub fn revenue(&self) -> f64 {
        (self.sales_volume * self.avg_price).round()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct DomTrendPoint {
    pub year: i32,
    pub month: u32,
    pub mediandom: f64,
    #[serde(default)]
    pub listings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SalesVolumePoint {
    pub year: i32,
    pub month: u32,
    pub salesvolume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "PascalCase")]
pub struct ActiveListingPoint {
    pub year: i32,
    pub month: u32,
    pub active_listings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SalesToListPoint {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "SLPR")]
    pub slpr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct PricePerSqftPoint {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "MedianPPSF")]
    pub median_ppsf: f64,
    #[serde(rename = "AveragePPSF")]
    pub average_ppsf: f64,
}

macro_rules! impl_dated {
    ($($ty:ty),* $(,)?) => {
        $(impl Dated for $ty {
            fn year(&self) -> i32 {
                self.year
            }
        })*
    };
}

impl_dated!(
    HistoricalTrendPoint,
    DomTrendPoint,
    SalesVolumePoint,
    ActiveListingPoint,
    SalesToListPoint,
    PricePerSqftPoint,
);

/// Summarize one field of a point series.
pub fn summarize<T>(points: &[&T], field: impl Fn(&T) -> f64) -> Option<SeriesSummary> {
    let values: Vec<f64> = points.iter().map(|p| field(p)).collect();
    SeriesSummary::from_values(&values)
}

// ============================================================================
// Month x year tables
// ============================================================================

/// Values keyed by month then by year, as used by the median sales and
/// months-of-inventory charts. Month keys are either `"1".."12"` or
/// `"Jan".."Dec"` depending on the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthYearSeries(pub BTreeMap<String, BTreeMap<String, Option<f64>>>);

impl MonthYearSeries {
    /// Sorted distinct years across all months.
    pub fn years(&self) -> Vec<String> {
        self.0
            .values()
            .flat_map(|by_year| by_year.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Months in calendar order; keys that are not months are dropped.
    pub fn months(&self) -> Vec<(u32, &BTreeMap<String, Option<f64>>)> {
        let mut months: Vec<_> = self
            .0
            .iter()
            .filter_map(|(key, by_year)| month_number(key).map(|m| (m, by_year)))
            .collect();
        months.sort_by_key(|(m, _)| *m);
        months
    }

    pub fn value(&self, month: u32, year: &str) -> Option<f64> {
        self.months()
            .into_iter()
            .find(|(m, _)| *m == month)
            .and_then(|(_, by_year)| by_year.get(year).copied().flatten())
    }

    /// All present values for one year, in calendar order.
    pub fn year_values(&self, year: &str) -> Vec<f64> {
        self.months()
            .into_iter()
            .filter_map(|(_, by_year)| by_year.get(year).copied().flatten())
            .collect()
    }
}

/// Months-of-inventory payload wraps its series in a `data` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthsOfInventory {
    pub data: MonthYearSeries,
}

// ============================================================================
// Weekly series
// ============================================================================

/// Week number -> year -> count, used by the weekly pending and weekly price
/// reduction charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklySeries {
    #[serde(default)]
    pub data: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    #[serde(default)]
    pub latest_week: Option<String>,
}

/// One week's counts across years.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekRow {
    pub week: u32,
    pub by_year: BTreeMap<String, f64>,
}

impl WeekRow {
    pub fn total(&self) -> f64 {
        self.by_year.values().sum()
    }
}

impl WeeklySeries {
    pub fn years(&self) -> Vec<String> {
        self.data
            .values()
            .flat_map(|by_year| by_year.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Weeks sorted numerically, missing years filled with zero. When `year`
    /// is given only that year's column is kept.
    pub fn rows(&self, year: Option<&str>) -> Vec<WeekRow> {
        let years = self.years();
        let mut rows: Vec<WeekRow> = self
            .data
            .iter()
            .filter_map(|(week, values)| {
                let week = week.trim().parse::<u32>().ok()?;
                let by_year = years
                    .iter()
                    .filter(|y| year.map_or(true, |wanted| wanted == y.as_str()))
                    .map(|y| (y.clone(), values.get(y).copied().flatten().unwrap_or(0.0)))
                    .collect();
                Some(WeekRow { week, by_year })
            })
            .collect();
        rows.sort_by_key(|r| r.week);
        rows
    }

    pub fn total(&self, year: Option<&str>) -> f64 {
        self.rows(year).iter().map(WeekRow::total).sum()
    }

    pub fn average_weekly_total(&self, year: Option<&str>) -> Option<f64> {
        let rows = self.rows(year);
        if rows.is_empty() {
            return None;
        }
        Some(rows.iter().map(WeekRow::total).sum::<f64>() / rows.len() as f64)
    }

    pub fn latest_week_total(&self, year: Option<&str>) -> Option<f64> {
        self.rows(year).last().map(WeekRow::total)
    }
}

// ============================================================================
// Cities and chat
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct LocationsResponse {
    #[serde(default)]
    pub locations: Vec<String>,
}

/// Fallback shown when the chatbot returns no answer.
pub const CHAT_FALLBACK_ANSWER: &str =
    "I'm sorry, I couldn't process your request at the moment. Please try again.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub answer: Option<String>,
}

impl ChatReply {
    pub fn text(&self) -> &str {
        match self.answer.as_deref() {
            Some(a) if !a.trim().is_empty() => a,
            _ => CHAT_FALLBACK_ANSWER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::YearFilter;

    fn barometer(index: f64, active: f64, closed: f64) -> Barometer {
        Barometer {
            barometer_index: index,
            active_listings: active,
            new_listings: 0.0,
            pending_sales: 0.0,
            closed_sales: closed,
        }
    }

    #[test]
    fn test_parse_barometer() {
        let json = r#"{"BarometerIndex": 0.72, "ActiveListings": 1200, "NewListings": 300, "PendingSales": 210, "ClosedSales": 240}"#;
        let b: Barometer = serde_json::from_str(json).expect("parse barometer");
        assert_eq!(b.health(), MarketHealth::Strong);
        assert_eq!(b.percentage(), 72);
        assert_eq!(b.estimated_days_on_market(), Some(18));
        assert_eq!(b.months_of_inventory(), Some(60));
        assert_eq!(b.absorption_rate(), Some(20));
    }

    #[test]
    fn test_market_health_thresholds() {
        assert_eq!(MarketHealth::from_index(0.8), MarketHealth::Hot);
        assert_eq!(MarketHealth::from_index(0.79), MarketHealth::Strong);
        assert_eq!(MarketHealth::from_index(0.4), MarketHealth::Balanced);
        assert_eq!(MarketHealth::from_index(0.2), MarketHealth::BuyersMarket);
        assert_eq!(MarketHealth::from_index(0.1), MarketHealth::Cold);
        assert_eq!(MarketHealth::BuyersMarket.label(), "Buyer's Market");
    }

    #[test]
    fn test_barometer_zero_divisors() {
        let b = barometer(0.5, 0.0, 0.0);
        assert_eq!(b.estimated_days_on_market(), None);
        assert_eq!(b.months_of_inventory(), None);
        assert_eq!(b.absorption_rate(), None);
    }

    #[test]
    fn test_barometer_rejects_missing_fields() {
        let json = r#"{"BarometerIndex": 0.72}"#;
        assert!(serde_json::from_str::<Barometer>(json).is_err());
    }

    #[test]
    fn test_active_listing_summary_by_year() {
        let json = r#"[
            {"Year": 2023, "Month": 11, "ActiveListings": 100},
            {"Year": 2024, "Month": 1, "ActiveListings": 120},
            {"Year": 2024, "Month": 2, "ActiveListings": 180}
        ]"#;
        let points: Vec<ActiveListingPoint> = serde_json::from_str(json).expect("parse");
        let filtered = YearFilter::Year(2024).apply(&points);
        let s = summarize(&filtered, |p| p.active_listings).expect("summary");
        assert_eq!(s.total, 300.0);
        assert_eq!(s.max, 180.0);
        assert_eq!(s.growth_percent, Some(50.0));
    }

    #[test]
    fn test_month_year_series_ordering() {
        let json = r#"{"10": {"2023": 410000, "2024": null}, "2": {"2023": 380000, "2024": 395000}, "total": {}}"#;
        let series: MonthYearSeries = serde_json::from_str(json).expect("parse");
        assert_eq!(series.years(), vec!["2023", "2024"]);
        let months: Vec<u32> = series.months().iter().map(|(m, _)| *m).collect();
        assert_eq!(months, vec![2, 10]);
        assert_eq!(series.value(2, "2024"), Some(395000.0));
        assert_eq!(series.value(10, "2024"), None);
        assert_eq!(series.year_values("2023"), vec![380000.0, 410000.0]);
    }

    #[test]
    fn test_months_of_inventory_named_months() {
        let json = r#"{"data": {"Mar": {"2024": 2.1}, "Jan": {"2024": 1.8}}}"#;
        let moi: MonthsOfInventory = serde_json::from_str(json).expect("parse");
        assert_eq!(moi.data.year_values("2024"), vec![1.8, 2.1]);
    }

    #[test]
    fn test_weekly_series() {
        let json = r#"{"data": {"10": {"2023": 5, "2024": 7}, "2": {"2023": 3}}, "latest_week": "10"}"#;
        let weekly: WeeklySeries = serde_json::from_str(json).expect("parse");
        let rows = weekly.rows(None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].week, 2);
        assert_eq!(rows[0].by_year.get("2024"), Some(&0.0));
        assert_eq!(weekly.total(None), 15.0);
        assert_eq!(weekly.average_weekly_total(None), Some(7.5));
        assert_eq!(weekly.latest_week_total(None), Some(12.0));
        assert_eq!(weekly.total(Some("2024")), 7.0);
        assert_eq!(weekly.latest_week.as_deref(), Some("10"));
    }

    #[test]
    fn test_chat_reply_fallback() {
        assert_eq!(ChatReply { answer: None }.text(), CHAT_FALLBACK_ANSWER);
        assert_eq!(ChatReply { answer: Some("  ".into()) }.text(), CHAT_FALLBACK_ANSWER);
        assert_eq!(ChatReply { answer: Some("Prices rose.".into()) }.text(), "Prices rose.");
    }

    #[test]
    fn test_historical_revenue() {
        let json = r#"[{"year": 2024, "month": "2024-01-01", "sales_volume": 10, "avg_price": 450000.4, "median_price": 430000, "avg_ppsf": 301.456, "avg_dom": 21.34}]"#;
        let points: Vec<HistoricalTrendPoint> = serde_json::from_str(json).expect("parse");
        assert_eq!(points[0].revenue(), 4500004.0);
    }
}
