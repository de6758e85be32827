use std::time::Duration as StdDuration;
use time::{macros::time, Duration, OffsetDateTime, Time};

/// How often the grid is rebuilt when nothing else prompts it
pub(crate) const DEFAULT_INTERVAL: Duration = Duration::minutes(15);

/// Time of day at which the day-rollover refresh fires.  A few seconds past
/// midnight so that "today" has certainly changed.
const ROLLOVER: Time = time!(00:00:05);

/// Longest the UI will sleep waiting for input before checking the schedule
/// and the store again
const MAX_WAIT: StdDuration = StdDuration::from_secs(1);

/// Why a refresh is being run
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Trigger {
    Startup,
    Explicit,
    Interval,
    Midnight,
    StoreChanged,
}

/// Tracks when the next refresh is owed.  Refreshes are run by the caller,
/// one at a time, so a trigger that arrives while another is pending is
/// simply folded into it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RefreshSchedule {
    interval: Duration,
    next_tick: Option<OffsetDateTime>,
    next_midnight: Option<OffsetDateTime>,
    pending: Option<Trigger>,
}

impl RefreshSchedule {
    /// Create a schedule whose first refresh (a [`Trigger::Startup`]) is due
    /// immediately.  `interval` must be positive.
    pub(crate) fn new(interval: Duration, now: OffsetDateTime) -> RefreshSchedule {
        RefreshSchedule {
            interval,
            next_tick: now.checked_add(interval),
            next_midnight: next_midnight_after(now),
            pending: Some(Trigger::Startup),
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// Ask for a refresh as soon as possible.  An earlier request that has
    /// not run yet wins.
    pub(crate) fn request(&mut self, trigger: Trigger) {
        self.pending.get_or_insert(trigger);
    }

    /// Return the trigger that should run now, if any
    pub(crate) fn due(&self, now: OffsetDateTime) -> Option<Trigger> {
        if let Some(trigger) = self.pending {
            Some(trigger)
        } else if self.next_midnight.is_some_and(|t| now >= t) {
            Some(Trigger::Midnight)
        } else if self.next_tick.is_some_and(|t| now >= t) {
            Some(Trigger::Interval)
        } else {
            None
        }
    }

    /// Record that a refresh for `trigger` has just run.  Any refresh
    /// restarts the interval timer; the rollover deadline only moves once it
    /// has passed.
    pub(crate) fn mark_done(&mut self, trigger: Trigger, now: OffsetDateTime) {
        log::debug!("refresh for {trigger:?} done");
        self.pending = None;
        self.next_tick = now.checked_add(self.interval);
        if self.next_midnight.is_some_and(|t| now >= t) {
            self.next_midnight = next_midnight_after(now);
        }
    }

    /// How long to wait for input before the schedule needs looking at again
    pub(crate) fn timeout(&self, now: OffsetDateTime) -> StdDuration {
        if self.pending.is_some() {
            return StdDuration::ZERO;
        }
        [self.next_tick, self.next_midnight]
            .into_iter()
            .flatten()
            .min()
            .map_or(MAX_WAIT, |deadline| {
                StdDuration::try_from(deadline - now)
                    .unwrap_or(StdDuration::ZERO)
                    .min(MAX_WAIT)
            })
    }
}

/// The first rollover instant strictly after `now`: 00:00:05 on the
/// following day, in `now`'s UTC offset.  Returns `None` only at the very
/// end of the representable calendar.
pub(crate) fn next_midnight_after(now: OffsetDateTime) -> Option<OffsetDateTime> {
    let tomorrow = now.date().next_day()?;
    Some(tomorrow.with_time(ROLLOVER).assume_offset(now.offset()))
}
