//! Per-user cooldown windows for components flagged `COOLDOWN`.

use embedg_core::{MessageId, SetId, UserId};
use embedg_error::{DispatchError, DispatchErrorKind, DispatchResult};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

type CooldownKey = (MessageId, SetId, UserId);

/// Remembers when each user last ran each action set.
///
/// The table is only locked for the check-and-record step, never across I/O.
#[derive(Debug)]
pub struct CooldownTracker {
    window: Duration,
    last_used: Mutex<HashMap<CooldownKey, Instant>>,
}

impl CooldownTracker {
    /// Tracker enforcing `window` between uses.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_used: Mutex::new(HashMap::new()),
        }
    }

    /// The configured window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a use of every set in `set_ids`, or refuse all of them if any
    /// previous use is inside the window.
    ///
    /// Nothing is recorded unless every set passes.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchErrorKind::CoolingDown`] with the remaining whole
    /// seconds (rounded up) of the longest wait.
    #[instrument(skip(self, set_ids), fields(message_id = %message_id, user_id = %user_id, sets = set_ids.len()))]
    pub fn check_and_record(
        &self,
        message_id: MessageId,
        set_ids: &[&SetId],
        user_id: UserId,
    ) -> DispatchResult<()> {
        self.check_and_record_at(message_id, set_ids, user_id, Instant::now())
    }

    fn check_and_record_at(
        &self,
        message_id: MessageId,
        set_ids: &[&SetId],
        user_id: UserId,
        now: Instant,
    ) -> DispatchResult<()> {
        let mut last_used = match self.last_used.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Cooldown table lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        let remaining = set_ids
            .iter()
            .filter_map(|set_id| last_used.get(&(message_id, (*set_id).clone(), user_id)))
            .map(|previous| self.window.saturating_sub(now.saturating_duration_since(*previous)))
            .max()
            .unwrap_or_default();
        if !remaining.is_zero() {
            let retry_after_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            debug!(retry_after_secs, "Cooldown active");
            return Err(DispatchError::new(DispatchErrorKind::CoolingDown {
                retry_after_secs,
            }));
        }

        for set_id in set_ids {
            last_used.insert((message_id, (*set_id).clone(), user_id), now);
        }
        let window = self.window;
        last_used.retain(|_, at| now.saturating_duration_since(*at) < window);
        debug!(tracked = last_used.len(), "Cooldown recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> (MessageId, SetId, UserId) {
        (MessageId::new(1), SetId::new("vote").unwrap(), UserId::new(7))
    }

    #[test]
    fn test_second_use_inside_window_refused() {
        let tracker = CooldownTracker::new(Duration::from_secs(5));
        let (message, set, user) = key();
        let start = Instant::now();

        tracker.check_and_record_at(message, &[&set], user, start).unwrap();
        let err = tracker
            .check_and_record_at(message, &[&set], user, start + Duration::from_millis(1500))
            .unwrap_err();
        assert_eq!(err.kind(), &DispatchErrorKind::CoolingDown { retry_after_secs: 4 });
    }

    #[test]
    fn test_use_after_window_allowed() {
        let tracker = CooldownTracker::new(Duration::from_secs(5));
        let (message, set, user) = key();
        let start = Instant::now();

        tracker.check_and_record_at(message, &[&set], user, start).unwrap();
        tracker
            .check_and_record_at(message, &[&set], user, start + Duration::from_secs(5))
            .unwrap();
    }

    #[test]
    fn test_users_tracked_independently() {
        let tracker = CooldownTracker::new(Duration::from_secs(60));
        let (message, set, user) = key();

        tracker.check_and_record(message, &[&set], user).unwrap();
        tracker.check_and_record(message, &[&set], UserId::new(8)).unwrap();
        assert!(tracker.check_and_record(message, &[&set], user).is_err());
    }

    #[test]
    fn test_zero_window_never_refuses() {
        let tracker = CooldownTracker::new(Duration::ZERO);
        let (message, set, user) = key();
        tracker.check_and_record(message, &[&set], user).unwrap();
        tracker.check_and_record(message, &[&set], user).unwrap();
    }

    #[test]
    fn test_refused_batch_records_nothing() {
        let tracker = CooldownTracker::new(Duration::from_secs(5));
        let (message, cooling, user) = key();
        let fresh = SetId::new("fresh").unwrap();
        let start = Instant::now();

        tracker.check_and_record_at(message, &[&cooling], user, start).unwrap();
        let err = tracker
            .check_and_record_at(message, &[&fresh, &cooling], user, start + Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err.kind(), &DispatchErrorKind::CoolingDown { retry_after_secs: 4 });

        // `fresh` was refused with the batch, so it is still free.
        tracker
            .check_and_record_at(message, &[&fresh], user, start + Duration::from_secs(2))
            .unwrap();
    }
}
