// Nyseal — Retry policy
//
// Per-module state machine:
//   Pending → Attempting(n) → Active
//                           → RetryWait(n) → Attempting(n + 1)   (bounded)
//                           → Failed
//
// By default every failure (read, decrypt, activate) is retried alike. With
// `fail_fast_on_integrity`, authentication/padding failures stop at once.

use std::fmt;
use std::thread;
use std::time::Duration;

use serde::Serialize;

use super::{BootstrapError, LoadError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "attempt", rename_all = "snake_case")]
pub enum ModuleState {
    Pending,
    Attempting(u32),
    RetryWait(u32),
    Active,
    Failed,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleState::Pending => write!(f, "pending"),
            ModuleState::Attempting(n) => write!(f, "attempting ({n})"),
            ModuleState::RetryWait(n) => write!(f, "waiting after attempt {n}"),
            ModuleState::Active => write!(f, "active"),
            ModuleState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub fail_fast_on_integrity: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            fail_fast_on_integrity: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            fail_fast_on_integrity: false,
        }
    }

    pub fn fail_fast_on_integrity(mut self, enabled: bool) -> Self {
        self.fail_fast_on_integrity = enabled;
        self
    }

    /// Runs `attempt` (given the 1-based attempt number) until it succeeds or
    /// the bound is reached. Blocks the calling thread between attempts.
    pub fn run<T>(
        &self,
        module: &str,
        mut attempt: impl FnMut(u32) -> Result<T, LoadError>,
        mut observe: impl FnMut(ModuleState),
    ) -> Result<T, BootstrapError> {
        let max = self.max_attempts.max(1);
        let mut n = 1;
        loop {
            observe(ModuleState::Attempting(n));
            let err = match attempt(n) {
                Ok(value) => {
                    observe(ModuleState::Active);
                    return Ok(value);
                }
                Err(err) => err,
            };

            tracing::warn!("retry {}/{} failed for {}: {}", n, max, module, err);

            if self.fail_fast_on_integrity && err.is_integrity_failure() {
                observe(ModuleState::Failed);
                return Err(BootstrapError::Integrity {
                    module: module.to_string(),
                    source: err,
                });
            }
            if n >= max {
                observe(ModuleState::Failed);
                tracing::error!(module, attempts = max, "Module could not be loaded");
                return Err(BootstrapError::Exhausted {
                    module: module.to_string(),
                    attempts: max,
                    last: err,
                });
            }

            observe(ModuleState::RetryWait(n));
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Instant;

    use super::*;
    use crate::codec::DecryptionError;

    fn io_error() -> LoadError {
        LoadError::Io {
            path: PathBuf::from("encrypted/x_v1.nyrethenc"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
    }

    fn quick(max: u32) -> RetryPolicy {
        RetryPolicy::new(max, Duration::ZERO)
    }

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(500));
        assert!(!policy.fail_fast_on_integrity);
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let mut states = Vec::new();
        let value = quick(5)
            .run(
                "m",
                |n| if n < 3 { Err(io_error()) } else { Ok(n) },
                |s| states.push(s),
            )
            .unwrap();
        assert_eq!(value, 3);
        assert_eq!(
            states,
            vec![
                ModuleState::Attempting(1),
                ModuleState::RetryWait(1),
                ModuleState::Attempting(2),
                ModuleState::RetryWait(2),
                ModuleState::Attempting(3),
                ModuleState::Active,
            ]
        );
    }

    #[test]
    fn test_exhausts_exactly_max_attempts() {
        let mut calls = 0;
        let err = quick(4)
            .run::<()>(
                "m",
                |_| {
                    calls += 1;
                    Err(io_error())
                },
                |_| {},
            )
            .unwrap_err();
        assert_eq!(calls, 4);
        assert!(matches!(err, BootstrapError::Exhausted { attempts: 4, .. }));
    }

    #[test]
    fn test_integrity_failures_are_retried_by_default() {
        let mut calls = 0;
        let err = quick(3)
            .run::<()>(
                "m",
                |_| {
                    calls += 1;
                    Err(LoadError::Decrypt(DecryptionError::Authentication))
                },
                |_| {},
            )
            .unwrap_err();
        assert_eq!(calls, 3);
        assert!(matches!(err, BootstrapError::Exhausted { .. }));
    }

    #[test]
    fn test_fail_fast_stops_on_integrity_failure() {
        let mut calls = 0;
        let mut last = ModuleState::Pending;
        let err = quick(5)
            .fail_fast_on_integrity(true)
            .run::<()>(
                "m",
                |_| {
                    calls += 1;
                    Err(LoadError::Decrypt(DecryptionError::Authentication))
                },
                |s| last = s,
            )
            .unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(last, ModuleState::Failed);
        assert!(matches!(err, BootstrapError::Integrity { .. }));
    }

    #[test]
    fn test_fail_fast_still_retries_io() {
        let value = quick(5)
            .fail_fast_on_integrity(true)
            .run("m", |n| if n < 2 { Err(io_error()) } else { Ok(()) }, |_| {});
        assert!(value.is_ok());
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _ = quick(0).run::<()>(
            "m",
            |_| {
                calls += 1;
                Err(io_error())
            },
            |_| {},
        );
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_waits_between_attempts() {
        let started = Instant::now();
        let _ = RetryPolicy::new(3, Duration::from_millis(20)).run::<()>(
            "m",
            |_| Err(io_error()),
            |_| {},
        );
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
