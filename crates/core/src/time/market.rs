use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_MARKET_TZ: Tz = chrono_tz::America::New_York;
pub const DEFAULT_TRADING_TZ: Tz = chrono_tz::Europe::Berlin;

// Regular US equity session, exchange local time.
const SESSION_OPEN: (u32, u32) = (9, 30);
const SESSION_CLOSE: (u32, u32) = (16, 0);

/// Inclusive `[start, end]` wall-clock window in the trading timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingWindow {
    pub start: (u32, u32),
    pub end: (u32, u32),
}

impl TradingWindow {
    pub const fn new(start: (u32, u32), end: (u32, u32)) -> Self {
        Self { start, end }
    }

    fn contains(&self, hour: u32, minute: u32) -> bool {
        (hour, minute) >= self.start && (hour, minute) <= self.end
    }
}

/// Pre-open, mid-session and US-open windows (Europe/Berlin).
pub const DEFAULT_WINDOWS: [TradingWindow; 3] = [
    TradingWindow::new((8, 5), (8, 20)),
    TradingWindow::new((15, 15), (15, 45)),
    TradingWindow::new((20, 0), (20, 10)),
];

#[derive(Debug, Clone)]
pub struct MarketCalendar {
    pub market_tz: Tz,
    pub trading_tz: Tz,
    pub windows: Vec<TradingWindow>,
    holidays: HashSet<NaiveDate>,
}

impl Default for MarketCalendar {
    fn default() -> Self {
        Self {
            market_tz: DEFAULT_MARKET_TZ,
            trading_tz: DEFAULT_TRADING_TZ,
            windows: DEFAULT_WINDOWS.to_vec(),
            holidays: configured_holidays(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketSession {
    Open { closes_in: Duration },
    Closed { opens_in: Duration, next_open: DateTime<Tz> },
}

impl fmt::Display for MarketSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketSession::Open { closes_in } => {
                write!(f, "Open (closes in {})", format_duration(*closes_in))
            }
            MarketSession::Closed {
                opens_in,
                next_open,
            } => write!(
                f,
                "Closed (opens in {} at {})",
                format_duration(*opens_in),
                next_open.format("%Y-%m-%d %H:%M %Z")
            ),
        }
    }
}

impl MarketCalendar {
    pub fn from_env() -> anyhow::Result<Self> {
        let market_tz = tz_var("MARKET_TIMEZONE")?.unwrap_or(DEFAULT_MARKET_TZ);
        let trading_tz = tz_var("TRADING_TIMEZONE")?.unwrap_or(DEFAULT_TRADING_TZ);
        let extra = std::env::var("US_MARKET_HOLIDAYS").ok();
        Ok(Self {
            market_tz,
            trading_tz,
            windows: DEFAULT_WINDOWS.to_vec(),
            holidays: configured_holidays(extra.as_deref()),
        })
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.holidays.contains(&date)
    }

    pub fn session_at(&self, now_utc: DateTime<Utc>) -> anyhow::Result<MarketSession> {
        let local = now_utc.with_timezone(&self.market_tz);
        let today = local.date_naive();

        if self.is_trading_day(today) {
            let open = self.local_at(today, SESSION_OPEN)?;
            let close = self.local_at(today, SESSION_CLOSE)?;
            if local < open {
                return Ok(MarketSession::Closed {
                    opens_in: open.signed_duration_since(local),
                    next_open: open,
                });
            }
            if local < close {
                return Ok(MarketSession::Open {
                    closes_in: close.signed_duration_since(local),
                });
            }
        }

        let mut date = today + Duration::days(1);
        while !self.is_trading_day(date) {
            date = date + Duration::days(1);
        }
        let next_open = self.local_at(date, SESSION_OPEN)?;
        Ok(MarketSession::Closed {
            opens_in: next_open.signed_duration_since(local),
            next_open,
        })
    }

    /// Index of the trading window containing `now_utc`, if it is a weekday.
    pub fn active_window(&self, now_utc: DateTime<Utc>) -> Option<usize> {
        let local = now_utc.with_timezone(&self.trading_tz);
        if is_weekend(local.date_naive()) {
            return None;
        }
        self.windows
            .iter()
            .position(|w| w.contains(local.hour(), local.minute()))
    }

    /// Stable identifier for a scheduled run: trading-zone date plus window.
    pub fn window_key(&self, now_utc: DateTime<Utc>, window: usize) -> String {
        let local = now_utc.with_timezone(&self.trading_tz);
        format!("{}#{}", local.date_naive(), window)
    }

    fn local_at(&self, date: NaiveDate, (h, m): (u32, u32)) -> anyhow::Result<DateTime<Tz>> {
        let time = NaiveTime::from_hms_opt(h, m, 0).context("invalid session time")?;
        self.market_tz
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .with_context(|| format!("{date} {h:02}:{m:02} does not exist in {}", self.market_tz))
    }
}

pub fn format_duration(d: Duration) -> String {
    let total_minutes = d.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else {
        format!("{hours}h {minutes}m")
    }
}

fn tz_var(key: &str) -> anyhow::Result<Option<Tz>> {
    match std::env::var(key) {
        Ok(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<Tz>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{key} is not a valid IANA timezone: {e}")),
        _ => Ok(None),
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

// Years covered by the rule-based NYSE calendar.
const HOLIDAY_YEARS: std::ops::RangeInclusive<i32> = 2024..=2035;

fn configured_holidays(extra: Option<&str>) -> HashSet<NaiveDate> {
    let mut out: HashSet<NaiveDate> = HOLIDAY_YEARS.flat_map(nyse_holidays).collect();

    if let Some(s) = extra {
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match NaiveDate::parse_from_str(part, "%Y-%m-%d") {
                Ok(d) => {
                    out.insert(d);
                }
                Err(err) => tracing::warn!(value = part, error = %err, "ignoring invalid holiday"),
            }
        }
    }

    out
}

/// Full-day NYSE closures for `year`, on their observed dates.
fn nyse_holidays(year: i32) -> Vec<NaiveDate> {
    use chrono::Weekday::{Mon, Thu};

    let mut out = Vec::with_capacity(10);
    // New Year's Day on a Saturday is not made up on the preceding Friday.
    if let Some(d) = NaiveDate::from_ymd_opt(year, 1, 1) {
        if d.weekday() != chrono::Weekday::Sat {
            out.push(observed(d));
        }
    }
    for (m, d) in [(6, 19), (7, 4), (12, 25)] {
        if let Some(date) = NaiveDate::from_ymd_opt(year, m, d) {
            out.push(observed(date));
        }
    }
    out.extend(NaiveDate::from_weekday_of_month_opt(year, 1, Mon, 3)); // Martin Luther King Jr. Day
    out.extend(NaiveDate::from_weekday_of_month_opt(year, 2, Mon, 3)); // Washington's Birthday
    out.extend(easter_sunday(year).map(|e| e - Duration::days(2))); // Good Friday
    out.extend(last_weekday_of_month(year, 5, Mon)); // Memorial Day
    out.extend(NaiveDate::from_weekday_of_month_opt(year, 9, Mon, 1)); // Labor Day
    out.extend(NaiveDate::from_weekday_of_month_opt(year, 11, Thu, 4)); // Thanksgiving
    out
}

/// Saturday holidays are observed on Friday, Sunday holidays on Monday.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        chrono::Weekday::Sat => date - Duration::days(1),
        chrono::Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn last_weekday_of_month(year: i32, month: u32, weekday: chrono::Weekday) -> Option<NaiveDate> {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let mut date = NaiveDate::from_ymd_opt(ny, nm, 1)? - Duration::days(1);
    while date.weekday() != weekday {
        date = date - Duration::days(1);
    }
    Some(date)
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm).
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_during_regular_session() {
        // 2026-01-06 (Tuesday) 15:00 UTC = 10:00 EST.
        let now = Utc.with_ymd_and_hms(2026, 1, 6, 15, 0, 0).unwrap();
        let session = MarketCalendar::default().session_at(now).unwrap();
        assert_eq!(
            session,
            MarketSession::Open {
                closes_in: Duration::hours(6)
            }
        );
    }

    #[test]
    fn closed_on_weekend_rolls_to_monday() {
        // 2026-01-03 is Saturday; next open Monday 2026-01-05 09:30 EST = 14:30 UTC.
        let now = Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap();
        let MarketSession::Closed { opens_in, next_open } =
            MarketCalendar::default().session_at(now).unwrap()
        else {
            panic!("expected closed session");
        };
        assert_eq!(next_open.date_naive(), NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(opens_in, Duration::hours(50) + Duration::minutes(30));
    }

    #[test]
    fn closed_before_open_counts_down_to_same_day() {
        // 2026-01-06 13:00 UTC = 08:00 EST.
        let now = Utc.with_ymd_and_hms(2026, 1, 6, 13, 0, 0).unwrap();
        let MarketSession::Closed { opens_in, .. } =
            MarketCalendar::default().session_at(now).unwrap()
        else {
            panic!("expected closed session");
        };
        assert_eq!(opens_in, Duration::minutes(90));
    }

    #[test]
    fn configured_holiday_skips_day() {
        let cal = MarketCalendar::default()
            .with_holidays([NaiveDate::from_ymd_opt(2026, 1, 19).unwrap()]);
        // Friday 2026-01-16 after close -> Tuesday 2026-01-20.
        let now = Utc.with_ymd_and_hms(2026, 1, 16, 22, 0, 0).unwrap();
        let MarketSession::Closed { next_open, .. } = cal.session_at(now).unwrap() else {
            panic!("expected closed session");
        };
        assert_eq!(next_open.date_naive(), NaiveDate::from_ymd_opt(2026, 1, 20).unwrap());
    }

    #[test]
    fn trading_windows_follow_berlin_time() {
        let cal = MarketCalendar::default();
        // 2026-01-06 07:10 UTC = 08:10 CET.
        let now = Utc.with_ymd_and_hms(2026, 1, 6, 7, 10, 0).unwrap();
        assert_eq!(cal.active_window(now), Some(0));
        assert_eq!(cal.window_key(now, 0), "2026-01-06#0");

        // 2026-01-06 19:05 UTC = 20:05 CET.
        let now = Utc.with_ymd_and_hms(2026, 1, 6, 19, 5, 0).unwrap();
        assert_eq!(cal.active_window(now), Some(2));

        // 2026-01-06 12:00 UTC = 13:00 CET.
        let now = Utc.with_ymd_and_hms(2026, 1, 6, 12, 0, 0).unwrap();
        assert_eq!(cal.active_window(now), None);

        // Saturday inside a window.
        let now = Utc.with_ymd_and_hms(2026, 1, 3, 7, 10, 0).unwrap();
        assert_eq!(cal.active_window(now), None);
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn closed_on_observed_and_floating_holidays() {
        let cal = MarketCalendar::default();
        // Independence Day 2026 is a Saturday, observed Friday 2026-07-03. 15:00 UTC = 11:00 EDT.
        let now = Utc.with_ymd_and_hms(2026, 7, 3, 15, 0, 0).unwrap();
        let MarketSession::Closed { next_open, .. } = cal.session_at(now).unwrap() else {
            panic!("expected closed session on July 3rd");
        };
        assert_eq!(next_open.date_naive(), ymd(2026, 7, 6));

        // Thanksgiving 2026. 16:00 UTC = 11:00 EST.
        let now = Utc.with_ymd_and_hms(2026, 11, 26, 16, 0, 0).unwrap();
        let MarketSession::Closed { next_open, .. } = cal.session_at(now).unwrap() else {
            panic!("expected closed session on Thanksgiving");
        };
        assert_eq!(next_open.date_naive(), ymd(2026, 11, 27));
    }

    #[test]
    fn nyse_holidays_follow_calendar_rules() {
        let h2026 = nyse_holidays(2026);
        for d in [
            ymd(2026, 1, 1),
            ymd(2026, 1, 19),
            ymd(2026, 2, 16),
            ymd(2026, 4, 3),
            ymd(2026, 5, 25),
            ymd(2026, 6, 19),
            ymd(2026, 7, 3),
            ymd(2026, 9, 7),
            ymd(2026, 11, 26),
            ymd(2026, 12, 25),
        ] {
            assert!(h2026.contains(&d), "missing {d}");
        }
        assert_eq!(h2026.len(), 10);

        // 2027-12-25 is a Saturday, 2028-01-01 too: Christmas moves to Friday, New Year is dropped.
        assert!(nyse_holidays(2027).contains(&ymd(2027, 12, 24)));
        assert!(!nyse_holidays(2028).contains(&ymd(2027, 12, 31)));
        // 2028-06-19 is a Monday; 2033-06-19 is a Sunday -> Monday the 20th.
        assert!(nyse_holidays(2033).contains(&ymd(2033, 6, 20)));
    }

    #[test]
    fn easter_dates() {
        assert_eq!(easter_sunday(2024), Some(ymd(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(ymd(2025, 4, 20)));
        assert_eq!(easter_sunday(2026), Some(ymd(2026, 4, 5)));
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Duration::minutes(90)), "1h 30m");
        assert_eq!(format_duration(Duration::hours(50)), "2d 2h 0m");
    }
}
