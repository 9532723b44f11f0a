use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::domain::{
    common::QuotaConfig,
    quota::entities::{
        QuotaDecision, QuotaLimit, QuotaProvider, QuotaSnapshot, QuotaState, QuotaWindow,
    },
};

/// Rolls the window forward when it has elapsed and reports whether one more
/// call fits inside the limit. Pure: the caller decides whether to persist the
/// returned state.
pub fn evaluate_window(
    now: DateTime<Utc>,
    state: &QuotaState,
    limit: &QuotaLimit,
) -> (QuotaState, QuotaDecision) {
    let state = if now >= limit.window.close_at(state.window_start) {
        QuotaState {
            count: 0,
            window_start: limit.window.open_at(now),
        }
    } else {
        *state
    };

    let decision = QuotaDecision {
        allowed: state.count < limit.limit,
        count: state.count,
        limit: limit.limit,
        reset_at: limit.window.close_at(state.window_start),
    };

    (state, decision)
}

/// In-process call counters for rate-limited providers.
#[derive(Debug)]
pub struct QuotaTracker {
    limits: HashMap<QuotaProvider, QuotaLimit>,
    states: Mutex<HashMap<QuotaProvider, QuotaState>>,
}

impl QuotaTracker {
    pub fn new(vision: QuotaLimit, llm: QuotaLimit) -> Self {
        let mut limits = HashMap::new();
        limits.insert(QuotaProvider::Vision, vision);
        limits.insert(QuotaProvider::Llm, llm);

        Self {
            limits,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &QuotaConfig) -> Self {
        Self::new(
            QuotaLimit {
                limit: config.vision_monthly_limit,
                window: QuotaWindow::CalendarMonth,
            },
            QuotaLimit {
                limit: config.llm_per_minute_limit,
                window: QuotaWindow::Rolling(TimeDelta::minutes(1)),
            },
        )
    }

    pub fn check(&self, provider: QuotaProvider) -> QuotaDecision {
        self.check_at(provider, Utc::now())
    }

    /// Claims one call slot if the window has room. The check and the count
    /// happen under the same lock, so concurrent callers cannot overshoot.
    pub fn reserve(&self, provider: QuotaProvider) -> QuotaDecision {
        self.reserve_at(provider, Utc::now())
    }

    /// Gives back a slot claimed by [`QuotaTracker::reserve`] when the call
    /// it guarded failed.
    pub fn release(&self, provider: QuotaProvider) -> QuotaDecision {
        self.release_at(provider, Utc::now())
    }

    pub fn check_at(&self, provider: QuotaProvider, now: DateTime<Utc>) -> QuotaDecision {
        self.update(provider, now, Usage::Peek)
    }

    pub fn reserve_at(&self, provider: QuotaProvider, now: DateTime<Utc>) -> QuotaDecision {
        self.update(provider, now, Usage::Reserve)
    }

    pub fn release_at(&self, provider: QuotaProvider, now: DateTime<Utc>) -> QuotaDecision {
        self.update(provider, now, Usage::Release)
    }

    pub fn snapshot(&self) -> Vec<QuotaSnapshot> {
        let now = Utc::now();
        [QuotaProvider::Vision, QuotaProvider::Llm]
            .into_iter()
            .map(|provider| {
                let decision = self.check_at(provider, now);
                QuotaSnapshot {
                    provider,
                    used: decision.count,
                    limit: decision.limit,
                    remaining: decision.remaining(),
                    reset_at: decision.reset_at,
                }
            })
            .collect()
    }

    fn update(&self, provider: QuotaProvider, now: DateTime<Utc>, usage: Usage) -> QuotaDecision {
        let limit = self.limits.get(&provider).copied().unwrap_or(QuotaLimit {
            limit: u32::MAX,
            window: QuotaWindow::CalendarMonth,
        });

        let mut states = self
            .states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = states.get(&provider).copied().unwrap_or(QuotaState {
            count: 0,
            window_start: limit.window.open_at(now),
        });

        let (mut next, decision) = evaluate_window(now, &current, &limit);
        let decision = match usage {
            Usage::Peek => decision,
            Usage::Reserve if !decision.allowed => decision,
            Usage::Reserve => {
                next.count = next.count.saturating_add(1);
                debug!(
                    provider = provider.label(),
                    count = next.count,
                    limit = limit.limit,
                    "Quota slot reserved"
                );
                QuotaDecision {
                    count: next.count,
                    ..decision
                }
            }
            Usage::Release => {
                next.count = next.count.saturating_sub(1);
                debug!(
                    provider = provider.label(),
                    count = next.count,
                    "Quota slot released"
                );
                QuotaDecision {
                    count: next.count,
                    allowed: next.count < limit.limit,
                    ..decision
                }
            }
        };
        states.insert(provider, next);

        decision
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Peek,
    Reserve,
    Release,
}
