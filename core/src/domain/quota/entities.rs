use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuotaProvider {
    Vision,
    Llm,
}

impl QuotaProvider {
    pub fn label(&self) -> &'static str {
        match self {
            QuotaProvider::Vision => "Clarifai",
            QuotaProvider::Llm => "Gemini",
        }
    }
}

/// How a quota window is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaWindow {
    /// Resets at 00:00 UTC on the first day of each month.
    CalendarMonth,
    /// Resets once the given span has elapsed since the window opened.
    Rolling(TimeDelta),
}

impl QuotaWindow {
    /// Start of the window that `now` falls into, for a freshly opened window.
    pub fn open_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            QuotaWindow::CalendarMonth => Utc
                .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
                .single()
                .unwrap_or(now),
            QuotaWindow::Rolling(_) => now,
        }
    }

    pub fn close_at(&self, window_start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            QuotaWindow::CalendarMonth => {
                let (year, month) = if window_start.month() == 12 {
                    (window_start.year() + 1, 1)
                } else {
                    (window_start.year(), window_start.month() + 1)
                };
                Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
                    .single()
                    .unwrap_or(window_start + TimeDelta::days(31))
            }
            QuotaWindow::Rolling(span) => window_start + *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimit {
    pub limit: u32,
    pub window: QuotaWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub count: u32,
    pub limit: u32,
    pub reset_at: DateTime<Utc>,
}

impl QuotaDecision {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuotaSnapshot {
    pub provider: QuotaProvider,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}
