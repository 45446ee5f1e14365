//! Time utilities for the ledger
//!
//! Orders and log entries are stamped with epoch milliseconds; history and
//! payment views bucket them into Monday-to-Sunday weeks in local time.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `FRIGO_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is
//! useful for exercising the weekly views without waiting for a week.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! FRIGO_MOCK_TIME="2025-12-25 14:30:00" frigorifico orders history
//! ```

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "FRIGO_MOCK_TIME";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<Duration>> = OnceLock::new();

const MONTHS_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const MONTHS_ES_SHORT: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
];

/// Initialize the mock time offset based on the environment variable.
/// Returns the offset between mock time and real time at process start.
#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                        let real_now = chrono::Local::now();
                        let offset = mock_dt.signed_duration_since(real_now);
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    } else {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        );
                    }
                } else {
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = "%Y-%m-%d %H:%M:%S",
                        "Invalid mock time format"
                    );
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Epoch milliseconds of a local datetime
pub fn to_epoch_millis(dt: &DateTime<Local>) -> i64 {
    dt.timestamp_millis()
}

/// Local datetime for epoch milliseconds, `None` when out of range
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(millis).single()
}

/// Resolve a naive local datetime, stepping over DST gaps.
fn resolve_local(naive: NaiveDateTime) -> DateTime<Local> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| Local.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

/// Local midnight at the start of `date`
pub fn start_of_day(date: NaiveDate) -> DateTime<Local> {
    resolve_local(date.and_time(chrono::NaiveTime::MIN))
}

/// A Monday-to-Sunday week in local time. `end` is the last millisecond of Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekRange {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl WeekRange {
    /// Whether an epoch-millisecond timestamp falls inside this week (inclusive)
    pub fn contains_millis(&self, millis: i64) -> bool {
        millis >= self.start.timestamp_millis() && millis <= self.end.timestamp_millis()
    }

    /// Stable key for the week: the Monday's date
    pub fn key(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Long label, e.g. `Del 1 de enero al 7 de enero de 2024`
    pub fn label(&self) -> String {
        format_week_range(&self.start, &self.end)
    }

    /// Short label, e.g. `1/1 al 7/1`
    pub fn short_label(&self) -> String {
        format_week_button_label(&self.start, &self.end)
    }
}

/// Compute the week containing `date`: Monday 00:00:00.000 through Sunday
/// 23:59:59.999, local time.
pub fn week_boundaries(date: &DateTime<Local>) -> WeekRange {
    week_of_date(date.date_naive())
}

/// Week containing a calendar date
pub fn week_of_date(day: NaiveDate) -> WeekRange {
    // 0 = Sunday, so Monday maps to 0 and Sunday to 6
    let day_of_week = day.weekday().num_days_from_sunday();
    let diff_to_monday = (day_of_week + 6) % 7;

    let monday = day - Duration::days(i64::from(diff_to_monday));
    let next_monday = monday + Duration::days(7);

    let start = start_of_day(monday);
    let end = start_of_day(next_monday) - Duration::milliseconds(1);

    WeekRange { start, end }
}

/// Format a week range in Spanish.
///
/// Same year: `Del 1 de enero al 7 de enero de 2024`.
/// Across years: `Del 29 de diciembre de 2025 al 4 de enero de 2026`.
pub fn format_week_range(start: &DateTime<Local>, end: &DateTime<Local>) -> String {
    let start_label = format_day_month(start);
    let end_label = format_day_month(end);

    if start.year() == end.year() {
        format!("Del {} al {} de {}", start_label, end_label, start.year())
    } else {
        format!(
            "Del {} de {} al {} de {}",
            start_label,
            start.year(),
            end_label,
            end.year()
        )
    }
}

/// Short numeric week label: `1/1 al 7/1`
pub fn format_week_button_label(start: &DateTime<Local>, end: &DateTime<Local>) -> String {
    format!(
        "{}/{} al {}/{}",
        start.day(),
        start.month(),
        end.day(),
        end.month()
    )
}

/// `1 de enero`
pub fn format_day_month(dt: &DateTime<Local>) -> String {
    format!("{} de {}", dt.day(), MONTHS_ES[dt.month0() as usize])
}

/// Medium date with short time, e.g. `1 ene 2024, 14:30`
pub fn format_datetime_es(dt: &DateTime<Local>) -> String {
    format!(
        "{} {} {}, {}",
        dt.day(),
        MONTHS_ES_SHORT[dt.month0() as usize],
        dt.year(),
        dt.format("%H:%M")
    )
}

/// Format epoch milliseconds for display, with a placeholder when missing
pub fn format_millis_es(millis: Option<i64>) -> String {
    millis
        .and_then(from_epoch_millis)
        .map(|dt| format_datetime_es(&dt))
        .unwrap_or_else(|| "Fecha no disponible".to_string())
}
