//! Page-readiness gate and retry bookkeeping.
//!
//! The dashboards render their numbers client-side, so a completed fetch
//! does not mean the data was on the page. After each fetch the driver
//! evaluates a readiness probe selector and asks the gate what to do:
//! re-issue the identical fetch (bypassing the fetch layer's request
//! dedup) or accept the page as terminal. A terminal-but-not-ready page is
//! still handed to the extractor - partial data beats no data.
//!
//! Attempt counters travel by value inside the state, never as shared
//! mutable counters across concurrent fetches.

/// Lifecycle of one work item:
/// `Pending -> {Ready, NotReady} -> (Pending)* -> Terminal`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// A fetch for this attempt is owed (or in flight)
    Pending { attempt: u32 },
    /// Fetch completed and the readiness probe matched
    Ready { attempt: u32 },
    /// Fetch completed but the probe found nothing
    NotReady { attempt: u32 },
    /// Accepted; the response goes to the extractor ready or not
    Terminal { attempt: u32, ready: bool },
}

impl FetchState {
    pub fn attempt(&self) -> u32 {
        match *self {
            FetchState::Pending { attempt }
            | FetchState::Ready { attempt }
            | FetchState::NotReady { attempt }
            | FetchState::Terminal { attempt, .. } => attempt,
        }
    }
}

/// Decides transitions after each completed fetch. `max_retries` bounds
/// the number of re-fetches after the first attempt; the observed
/// production default is 1.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessGate {
    max_retries: u32,
}

impl ReadinessGate {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Classify a completed fetch. `attempt` is the 1-based count of
    /// fetches issued so far for this work item.
    pub fn on_fetched(&self, attempt: u32, probe_matched: bool) -> FetchState {
        if probe_matched {
            FetchState::Ready { attempt }
        } else {
            FetchState::NotReady { attempt }
        }
    }

    /// Advance the state machine one step. `NotReady` becomes another
    /// `Pending` while retries remain, `Terminal` otherwise; `Ready` is
    /// always `Terminal`.
    pub fn advance(&self, state: FetchState) -> FetchState {
        match state {
            FetchState::Ready { attempt } => FetchState::Terminal {
                attempt,
                ready: true,
            },
            FetchState::NotReady { attempt } if attempt <= self.max_retries => {
                FetchState::Pending {
                    attempt: attempt + 1,
                }
            }
            FetchState::NotReady { attempt } => FetchState::Terminal {
                attempt,
                ready: false,
            },
            // Pending and Terminal are driver states, not gate decisions
            other => other,
        }
    }
}
