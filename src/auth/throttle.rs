use moka::sync::Cache;
use std::time::{Duration, Instant};

use crate::error::PanelError;

#[derive(Debug, Clone, Copy)]
struct Attempts {
    failures: u32,
    locked_until: Option<Instant>,
}

/// Per-username failed-login counter kept in memory.
///
/// After `max_attempts` failures the name is refused for `lockout`; once that elapses the
/// counter starts over.
#[derive(Clone)]
pub struct LoginThrottle {
    attempts: Cache<String, Attempts>,
    max_attempts: u32,
    lockout: Duration,
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        let attempts = Cache::builder()
            .time_to_live(lockout.max(Duration::from_secs(1)))
            .max_capacity(100_000)
            .build();
        Self {
            attempts,
            max_attempts: max_attempts.max(1),
            lockout,
        }
    }

    pub fn check(&self, username: &str) -> Result<(), PanelError> {
        let Some(entry) = self.attempts.get(username) else {
            return Ok(());
        };
        match entry.locked_until {
            Some(until) => {
                let now = Instant::now();
                if until > now {
                    Err(PanelError::TooManyAttempts {
                        retry_after_secs: until.duration_since(now).as_secs().max(1),
                    })
                } else {
                    self.attempts.invalidate(username);
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    /// Returns the failure count after recording this one.
    pub fn record_failure(&self, username: &str) -> u32 {
        let max = self.max_attempts;
        let lockout = self.lockout;
        let entry = self
            .attempts
            .entry(username.to_string())
            .and_upsert_with(|existing| {
                let failures = existing.map(|e| e.into_value().failures).unwrap_or(0) + 1;
                Attempts {
                    failures,
                    locked_until: (failures >= max).then(|| Instant::now() + lockout),
                }
            });
        entry.into_value().failures
    }

    pub fn clear(&self, username: &str) {
        self.attempts.invalidate(username);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_after_max_failures() {
        let throttle = LoginThrottle::new(3, Duration::from_secs(60));
        for _ in 0..2 {
            throttle.record_failure("eve");
            assert!(throttle.check("eve").is_ok());
        }
        assert_eq!(throttle.record_failure("eve"), 3);
        assert!(matches!(
            throttle.check("eve"),
            Err(PanelError::TooManyAttempts { .. })
        ));
        assert!(throttle.check("someone-else").is_ok());
    }

    #[test]
    fn clear_resets_counter() {
        let throttle = LoginThrottle::new(2, Duration::from_secs(60));
        throttle.record_failure("eve");
        throttle.clear("eve");
        assert_eq!(throttle.record_failure("eve"), 1);
        assert!(throttle.check("eve").is_ok());
    }

    #[test]
    fn lock_expires() {
        let throttle = LoginThrottle::new(1, Duration::from_millis(30));
        throttle.record_failure("eve");
        assert!(throttle.check("eve").is_err());
        std::thread::sleep(Duration::from_millis(60));
        assert!(throttle.check("eve").is_ok());
        assert_eq!(throttle.record_failure("eve"), 1);
    }
}
