use std::future::Future;
use std::time::{Duration, Instant};

use crate::utils::error::{ActionError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const MATURITY_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Runs one action under an overall deadline. On expiry the action's
/// in-flight calls are dropped and the run fails with `Timeout`.
pub struct ActionRunner {
    name: &'static str,
    deadline: Duration,
}

impl ActionRunner {
    pub fn new(name: &'static str, deadline: Duration) -> Self {
        Self { name, deadline }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub async fn run<T, F>(&self, action: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tracing::info!("starting {} (deadline {:?})", self.name, self.deadline);
        let started = Instant::now();

        let result = tokio::time::timeout(self.deadline, action)
            .await
            .map_err(|_| ActionError::Timeout {
                seconds: self.deadline.as_secs(),
            })?;

        match &result {
            Ok(_) => tracing::info!("{} finished in {:?}", self.name, started.elapsed()),
            Err(e) => tracing::debug!("{} failed after {:?}: {}", self.name, started.elapsed(), e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_result_through() {
        let runner = ActionRunner::new("commitguard", DEFAULT_TIMEOUT);
        assert_eq!(runner.run(async { Ok(7) }).await.unwrap(), 7);

        let err = runner
            .run(async {
                Err::<(), _>(ActionError::DivergedHistory {
                    status: "diverged".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::DivergedHistory { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline_is_timeout() {
        let runner = ActionRunner::new("opslevel", Duration::from_secs(2));

        let err = runner
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::Timeout { seconds: 2 }));
        assert_eq!(err.exit_code(), 3);
    }
}
