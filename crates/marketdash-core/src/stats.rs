//! Client-side aggregation over chart series.
//!
//! The backend returns pre-aggregated market statistics; the dashboard only
//! derives display figures from them (totals, averages, extremes, growth).
//! Everything here is pure and allocation-light.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Number of trailing points used for the "recent" average.
pub const RECENT_WINDOW: usize = 3;

/// Summary figures for a single numeric series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// First value to last value, in percent.
    pub growth_percent: Option<f64>,
    /// Mean of the last [`RECENT_WINDOW`] values.
    pub recent_mean: f64,
    pub latest: f64,
}

impl SeriesSummary {
    /// Summarize a series. Returns `None` for an empty series.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        let latest = *values.last()?;
        let total: f64 = values.iter().sum();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let recent = &values[values.len().saturating_sub(RECENT_WINDOW)..];
        let recent_mean = recent.iter().sum::<f64>() / recent.len() as f64;

        let growth_percent = if values.len() >= 2 && first != 0.0 {
            Some((latest - first) / first * 100.0)
        } else {
            None
        };

        Some(Self {
            count: values.len(),
            total,
            mean: total / values.len() as f64,
            min,
            max,
            growth_percent,
            recent_mean,
            latest,
        })
    }

    /// Direction of the recent average relative to the overall average.
    pub fn trend(&self) -> Trend {
        if self.recent_mean > self.mean {
            Trend::Rising
        } else if self.recent_mean < self.mean {
            Trend::Falling
        } else {
            Trend::Flat
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
    Flat,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Rising => "above average",
            Trend::Falling => "below average",
            Trend::Flat => "at average",
        }
    }
}

/// Format a growth percentage the way the dashboard cards do (`+12%`, `-3%`, `N/A`).
pub fn format_growth(growth: Option<f64>) -> String {
    match growth {
        Some(g) => {
            // Normalize -0 so tiny declines print as "0%".
            let rounded = if g.round() == 0.0 { 0.0 } else { g.round() };
            if rounded > 0.0 {
                format!("+{}%", rounded)
            } else {
                format!("{}%", rounded)
            }
        }
        None => "N/A".to_string(),
    }
}

/// A chart point carrying a calendar year.
pub trait Dated {
    fn year(&self) -> i32;
}

/// Year selector used by every time-series chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearFilter {
    #[default]
    All,
    Year(i32),
}

impl YearFilter {
    pub fn accepts(&self, year: i32) -> bool {
        match self {
            YearFilter::All => true,
            YearFilter::Year(y) => *y == year,
        }
    }

    pub fn apply<'a, T: Dated>(&self, points: &'a [T]) -> Vec<&'a T> {
        points.iter().filter(|p| self.accepts(p.year())).collect()
    }
}

impl FromStr for YearFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(YearFilter::All);
        }
        s.parse::<i32>()
            .map(YearFilter::Year)
            .map_err(|_| format!("expected \"all\" or a year, got {:?}", s))
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::All => f.write_str("all"),
            YearFilter::Year(y) => write!(f, "{}", y),
        }
    }
}

/// Sorted distinct years present in a series.
pub fn available_years<T: Dated>(points: &[T]) -> Vec<i32> {
    points
        .iter()
        .map(Dated::year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point(i32);

    impl Dated for Point {
        fn year(&self) -> i32 {
            self.0
        }
    }

    #[test]
    fn test_summary_empty() {
        assert!(SeriesSummary::from_values(&[]).is_none());
    }

    #[test]
    fn test_summary_basic() {
        let s = SeriesSummary::from_values(&[100.0, 150.0, 120.0, 200.0]).expect("summary");
        assert_eq!(s.count, 4);
        assert_eq!(s.total, 570.0);
        assert_eq!(s.mean, 142.5);
        assert_eq!(s.min, 100.0);
        assert_eq!(s.max, 200.0);
        assert_eq!(s.latest, 200.0);
        assert_eq!(s.growth_percent, Some(100.0));
        assert!((s.recent_mean - 470.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.trend(), Trend::Rising);
    }

    #[test]
    fn test_summary_single_point_has_no_growth() {
        let s = SeriesSummary::from_values(&[42.0]).expect("summary");
        assert_eq!(s.growth_percent, None);
        assert_eq!(s.recent_mean, 42.0);
        assert_eq!(s.trend(), Trend::Flat);
    }

    #[test]
    fn test_summary_zero_first_value_has_no_growth() {
        let s = SeriesSummary::from_values(&[0.0, 10.0]).expect("summary");
        assert_eq!(s.growth_percent, None);
    }

    #[test]
    fn test_format_growth() {
        assert_eq!(format_growth(Some(12.4)), "+12%");
        assert_eq!(format_growth(Some(-3.6)), "-4%");
        assert_eq!(format_growth(Some(0.2)), "0%");
        assert_eq!(format_growth(Some(-0.3)), "0%");
        assert_eq!(format_growth(None), "N/A");
    }

    #[test]
    fn test_year_filter() {
        let points = vec![Point(2023), Point(2024), Point(2023)];
        assert_eq!(YearFilter::All.apply(&points).len(), 3);
        assert_eq!(YearFilter::Year(2023).apply(&points).len(), 2);
        assert_eq!(available_years(&points), vec![2023, 2024]);

        assert_eq!("all".parse::<YearFilter>(), Ok(YearFilter::All));
        assert_eq!("2024".parse::<YearFilter>(), Ok(YearFilter::Year(2024)));
        assert!("twenty".parse::<YearFilter>().is_err());
    }
}
