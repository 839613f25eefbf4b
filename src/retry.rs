use std::thread;
use std::time::Duration;

/// Bounded retry with a fixed delay between attempts.
///
/// Used for the operations that are allowed to fail transiently: connecting
/// to the target host and spawning worker threads. The budget is strict; once
/// spent, the last error is returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run `op` until it succeeds or the attempt budget is spent, sleeping
    /// `delay` between attempts. A budget of zero still runs once.
    pub fn run<T, E>(&self, mut op: impl FnMut() -> Result<T, E>) -> Result<T, E> {
        let budget = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= budget => return Err(err),
                Err(_) => {
                    attempt += 1;
                    thread::sleep(self.delay);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_on_first_attempt_runs_once() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut calls = 0;
        let result: Result<u32, ()> = policy.run(|| {
            calls += 1;
            Ok(42)
        });
        assert_eq!(result, Ok(42));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_retries_until_success() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut calls = 0;
        let result: Result<u32, &str> = policy.run(|| {
            calls += 1;
            if calls < 3 {
                Err("not yet")
            } else {
                Ok(7)
            }
        });
        assert_eq!(result, Ok(7));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhausts_budget_and_returns_last_error() {
        let policy = RetryPolicy::new(4, Duration::ZERO);
        let mut calls = 0;
        let result: Result<(), u32> = policy.run(|| {
            calls += 1;
            Err(calls)
        });
        assert_eq!(result, Err(4));
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        let mut calls = 0;
        let result: Result<(), ()> = policy.run(|| {
            calls += 1;
            Err(())
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
