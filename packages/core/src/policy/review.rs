use chrono::{DateTime, Duration, Utc};

use crate::{config::PolicyConfig, model::AppStatus};

pub const UNDER_REVIEW_LABEL: &str = "Under review";

/// Whether an app can be downloaded right now, and if not, for how long.
///
/// Always recomputed from `status` and `created_at`; two reads of the same
/// record can disagree without any write in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Availability {
    pub can_download: bool,
    pub remaining: Duration,
    /// Empty when downloadable.
    pub label: String,
}

impl Availability {
    pub fn remaining_ms(&self) -> i64 {
        self.remaining.num_milliseconds()
    }

    fn open() -> Self {
        Self {
            can_download: true,
            remaining: Duration::zero(),
            label: String::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReviewGate {
    pub review_period: Duration,
}

impl ReviewGate {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            review_period: config.review_period,
        }
    }

    pub fn evaluate(
        &self,
        status: AppStatus,
        created_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Availability {
        if status == AppStatus::Approved {
            return Availability::open();
        }

        let Some(created_at) = created_at else {
            return Availability {
                can_download: false,
                remaining: self.review_period,
                label: UNDER_REVIEW_LABEL.to_string(),
            };
        };

        let elapsed = now - created_at;
        if elapsed >= self.review_period {
            return Availability::open();
        }

        let remaining = (self.review_period - elapsed).max(Duration::zero());
        Availability {
            can_download: false,
            remaining,
            label: countdown_label(remaining),
        }
    }
}

fn countdown_label(remaining: Duration) -> String {
    let hours = remaining.num_hours();
    let minutes = (remaining - Duration::hours(hours)).num_minutes();

    if hours > 0 {
        format!("Available in {hours}h {minutes}m")
    } else if minutes > 0 {
        format!("Available in {minutes}m")
    } else {
        UNDER_REVIEW_LABEL.to_string()
    }
}
