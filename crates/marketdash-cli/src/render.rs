//! Plain-text rendering of command results.

use marketdash_core::models::{
    summarize, AdminUser, Barometer, HistoricalTrendPoint, MarketTables, MonthYearSeries,
    PropertyKind, User, UserCounts, WeeklySeries,
};
use marketdash_core::stats::{available_years, format_growth, Dated, SeriesSummary, YearFilter};
use marketdash_core::utils::{
    format_currency, format_date, format_optional, format_thousands, month_abbrev, truncate_string,
};
use marketdash_core::ChartKind;

/// Column width for names and emails in the user listing
const NAME_WIDTH: usize = 24;
const EMAIL_WIDTH: usize = 30;

pub fn days(value: f64) -> String {
    format!("{} days", format_thousands(value))
}

pub fn count(value: f64) -> String {
    format_thousands(value)
}

pub fn ratio(value: f64) -> String {
    format!("{:.1}%", value)
}

pub fn currency(value: f64) -> String {
    format_currency(value)
}

fn or_na(value: Option<i64>, unit: &str) -> String {
    value
        .map(|v| format!("{}{}", format_thousands(v as f64), unit))
        .unwrap_or_else(|| "N/A".to_string())
}

fn heading(kind: ChartKind, city: &str, year: YearFilter) {
    match year {
        YearFilter::All => println!("{} - {}", kind.title(), city),
        YearFilter::Year(y) => println!("{} - {} ({})", kind.title(), city, y),
    }
    println!();
}

fn summary(stats: Option<SeriesSummary>, fmt: fn(f64) -> String) {
    let Some(s) = stats else {
        println!("No data for the selected period.");
        return;
    };
    println!();
    println!("  Latest:   {}", fmt(s.latest));
    println!("  Average:  {} (recent {}, {})", fmt(s.mean), fmt(s.recent_mean), s.trend().label());
    println!("  Range:    {} - {}", fmt(s.min), fmt(s.max));
    println!("  Growth:   {}", format_growth(s.growth_percent));
}

pub fn user_profile(user: &User) {
    println!("{} <{}>", user.full_name, user.email);
    println!("  id:   {}", user.id);
    println!("  role: {}", user.role);
}

pub fn cities(cities: &[String]) {
    if cities.is_empty() {
        println!("No cities available.");
        return;
    }
    for city in cities {
        println!("{}", city);
    }
}

pub fn barometer(city: &str, b: &Barometer) {
    heading(ChartKind::Barometer, city, YearFilter::All);
    println!("  {}% - {}", b.percentage(), b.health().label());
    println!();
    println!("  Active listings:    {}", format_thousands(b.active_listings));
    println!("  New listings:       {}", format_thousands(b.new_listings));
    println!("  Pending sales:      {}", format_thousands(b.pending_sales));
    println!("  Closed sales:       {}", format_thousands(b.closed_sales));
    println!("  Est. days on market: {}", or_na(b.estimated_days_on_market(), " days"));
    println!("  Months of inventory: {}", or_na(b.months_of_inventory(), ""));
    println!("  Absorption rate:    {}", or_na(b.absorption_rate(), "%"));
}

pub fn historical_trend(city: &str, points: &[HistoricalTrendPoint], year: YearFilter) {
    heading(ChartKind::HistoricalTrend, city, year);
    let selected = year.apply(points);
    println!(
        "  {:<14} {:>8} {:>14} {:>14} {:>10} {:>8}",
        "Month", "Sales", "Avg price", "Median", "$/sqft", "DOM"
    );
    for p in &selected {
        println!(
            "  {:<14} {:>8} {:>14} {:>14} {:>10} {:>8}",
            format_date(&p.month),
            format_thousands(p.sales_volume),
            format_currency(p.avg_price),
            format_currency(p.median_price),
            format_currency(p.avg_ppsf),
            format_thousands(p.avg_dom),
        );
    }
    let revenue: f64 = selected.iter().map(|p| p.revenue()).sum();
    summary(summarize(&selected, |p| p.median_price), currency);
    println!("  Revenue:  {}", format_currency(revenue));
    years_footer(points);
}

/// A per-month point series with one value column.
pub fn monthly<T: Dated>(
    kind: ChartKind,
    city: &str,
    points: &[T],
    year: YearFilter,
    month: impl Fn(&T) -> u32,
    value: impl Fn(&T) -> f64,
    fmt: fn(f64) -> String,
) {
    heading(kind, city, year);
    let selected = year.apply(points);
    for &p in &selected {
        println!(
            "  {} {:<4} {:>14}",
            month_abbrev(month(p)).unwrap_or("?"),
            p.year(),
            fmt(value(p))
        );
    }
    summary(summarize(&selected, &value), fmt);
    years_footer(points);
}

fn years_footer<T: Dated>(points: &[T]) {
    let years: Vec<String> = available_years(points).iter().map(i32::to_string).collect();
    if !years.is_empty() {
        println!("  Years:    {}", years.join(", "));
    }
}

/// Month x year grid (median sales, months of inventory).
pub fn month_year(kind: ChartKind, city: &str, series: &MonthYearSeries, year: YearFilter) {
    heading(kind, city, year);
    let years: Vec<String> = series
        .years()
        .into_iter()
        .filter(|y| y.parse().map(|y| year.accepts(y)).unwrap_or(false))
        .collect();
    if years.is_empty() {
        println!("No data for the selected period.");
        return;
    }

    let fmt: fn(f64) -> String = match kind {
        ChartKind::MedianSales => currency,
        _ => |v| format!("{:.1}", v),
    };

    print!("  {:<5}", "");
    for y in &years {
        print!(" {:>12}", y);
    }
    println!();
    for (month, by_year) in series.months() {
        print!("  {:<5}", month_abbrev(month).unwrap_or("?"));
        for y in &years {
            let cell = by_year
                .get(y)
                .copied()
                .flatten()
                .map(fmt)
                .unwrap_or_else(|| "-".to_string());
            print!(" {:>12}", cell);
        }
        println!();
    }

    if let Some(latest) = years.last() {
        println!();
        println!("  {}:", latest);
        summary(SeriesSummary::from_values(&series.year_values(latest)), fmt);
    }
}

pub fn weekly(kind: ChartKind, city: &str, series: &WeeklySeries, year: YearFilter) {
    heading(kind, city, year);
    let wanted = match year {
        YearFilter::All => None,
        YearFilter::Year(y) => Some(y.to_string()),
    };
    let rows = series.rows(wanted.as_deref());
    if rows.is_empty() {
        println!("No data for the selected period.");
        return;
    }

    for row in &rows {
        let cells: Vec<String> = row
            .by_year
            .iter()
            .map(|(y, v)| format!("{} {:>6}", y, format_thousands(*v)))
            .collect();
        println!("  Week {:>2}  {}", row.week, cells.join("  "));
    }

    println!();
    println!(
        "  Total:          {}",
        format_thousands(series.total(wanted.as_deref()))
    );
    if let Some(avg) = series.average_weekly_total(wanted.as_deref()) {
        println!("  Weekly average: {}", format_thousands(avg));
    }
    if let Some(latest) = series.latest_week_total(wanted.as_deref()) {
        let label = series.latest_week.as_deref().unwrap_or("latest");
        println!("  Week {}:  {}", label, format_thousands(latest));
    }
}

pub fn tables(city: &str, year: i32, month: u32, tables: &MarketTables, kinds: &[PropertyKind]) {
    println!(
        "Market tables - {} ({} {})",
        city,
        month_abbrev(month).unwrap_or("?"),
        year
    );
    for kind in kinds {
        let rows = tables.rows(*kind);
        println!();
        println!("{}", kind.title());
        if rows.is_empty() {
            println!("  No data available.");
            continue;
        }
        println!(
            "  {:<16} {:>8} {:>8} {:>6} {:>6} {:>6} {:>8} {:>8}  {}",
            "Price range", "Pending", "Adjust", "Sold", "New", "DOM", "L2C +/-", "Actives", "Trend"
        );
        for r in rows {
            println!(
                "  {:<16} {:>8} {:>8} {:>6} {:>6} {:>6} {:>8} {:>8}  {}",
                truncate_string(&r.price_range, 16),
                format_thousands(r.pending),
                format_thousands(r.price_adjustments),
                format_thousands(r.sold),
                format_thousands(r.new_listings),
                format_thousands(r.dom),
                format!("{:.1}", r.list_to_close),
                format_thousands(r.total_actives),
                r.trending,
            );
        }
    }
}

pub fn users(users: &[AdminUser]) {
    let counts = UserCounts::from_users(users);
    println!(
        "{} users ({} verified, {} unverified, {} admins)",
        counts.total, counts.verified, counts.unverified, counts.admins
    );
    if users.is_empty() {
        return;
    }
    println!();
    println!(
        "  {:>5}  {:<name$}  {:<email$}  {:<6}  {:<8}  {}",
        "ID",
        "Name",
        "Email",
        "Role",
        "Verified",
        "Joined",
        name = NAME_WIDTH,
        email = EMAIL_WIDTH
    );
    for u in users {
        let joined = u.timestamp.as_deref().map(format_date);
        println!(
            "  {:>5}  {:<name$}  {:<email$}  {:<6}  {:<8}  {}",
            u.id,
            truncate_string(&u.user_full_name, NAME_WIDTH),
            truncate_string(&u.user_email, EMAIL_WIDTH),
            u.role,
            if u.is_verified { "yes" } else { "no" },
            format_optional(&joined, "-"),
            name = NAME_WIDTH,
            email = EMAIL_WIDTH
        );
    }
}
