//! Execution Timeout Budgets
//!
//! Wall-clock bounds applied to every await on a child process. The budget
//! carries its configured length in whole seconds so that callers can report
//! the exact limit in timeout messages.

use std::future::Future;
use std::time::Duration;
use tokio::time;

/// Wall-clock budget for one await on a child process.
///
/// For piped commands the same budget is applied to each stage separately,
/// measured from that stage's spawn.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionTimeout {
    duration: Duration,
}

/// Returned when a bounded wait exceeds its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    /// The configured limit, in whole seconds.
    pub limit_secs: u64,
}

impl ExecutionTimeout {
    /// Create a budget from whole seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self {
            duration: Duration::from_secs(secs),
        }
    }

    /// The budget duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The budget in whole seconds, as configured.
    pub fn secs(&self) -> u64 {
        self.duration.as_secs()
    }

    /// Run a future, bounding it by this budget.
    pub async fn bound<F, T>(&self, future: F) -> Result<T, Elapsed>
    where
        F: Future<Output = T>,
    {
        match time::timeout(self.duration, future).await {
            Ok(value) => Ok(value),
            Err(_) => Err(Elapsed {
                limit_secs: self.duration.as_secs(),
            }),
        }
    }
}
