use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Persisted boundary used to filter "new" items on each poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_check_time: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(last_check_time: DateTime<Utc>) -> Self {
        Self { last_check_time }
    }

    /// Current time truncated to whole seconds, the resolution of the
    /// tracker's `created_on` filter
    pub fn now() -> Self {
        Self::new(Utc::now().trunc_subsecs(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_now_has_no_fractional_seconds() {
        let before = Utc::now().trunc_subsecs(0);
        let checkpoint = Checkpoint::now();
        assert_eq!(checkpoint.last_check_time.nanosecond(), 0);
        assert!(checkpoint.last_check_time >= before);
        assert!(checkpoint.last_check_time <= Utc::now());
    }
}
