//! System clock.

use chrono::{DateTime, SubsecRound, Utc};

use crate::ports::clock::Clock;

/// Wall-clock time truncated to whole seconds.
///
/// Rebuild timestamps are persisted in the state file and compared against
/// an interval configured in seconds; sub-second digits carry no meaning.
pub struct LiveClock;

impl Clock for LiveClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    #[test]
    fn ticks_in_whole_seconds() {
        let before = Utc::now().trunc_subsecs(0);
        let now = LiveClock.now();

        assert_eq!(now.nanosecond(), 0);
        assert!(now >= before);
        assert!(now <= Utc::now());
    }
}
