//! Data models for the market dashboard.
//!
//! - `User`, `Role`, `AdminUser`: account and session profile types
//! - Chart payloads: `Barometer`, `HistoricalTrendPoint`, `MonthYearSeries`,
//!   `WeeklySeries` and the per-month point types
//! - `MarketTables`, `PriceRangeRow`: normalized price-range tables

pub mod market;
pub mod table;
pub mod user;

pub use market::{
    summarize, ActiveListingPoint, Barometer, ChatReply, DomTrendPoint, HistoricalTrendPoint,
    MarketHealth, MonthYearSeries, MonthsOfInventory, PricePerSqftPoint, SalesToListPoint,
    SalesVolumePoint, WeekRow, WeeklySeries, CHAT_FALLBACK_ANSWER,
};
pub use table::{price_floor, write_csv, Lookback, MarketTables, PriceRangeRow, PropertyKind};
pub use user::{AdminUser, Role, User, UserCounts, UserFilter, UserSort, VerificationFilter};
