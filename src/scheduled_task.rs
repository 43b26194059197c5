use chrono::{DateTime, Utc};
use rocket::tokio::{self, task::JoinHandle, time::Duration};
use std::future::Future;

/// A task set to run at a specific point in the future.
/// If that point is already in the past, it runs immediately.
pub struct ScheduledTask<T> {
    handle: JoinHandle<T>,
}

impl<T> ScheduledTask<T>
where
    T: Send + 'static,
{
    pub fn new<Fut>(task: Fut, run_at: DateTime<Utc>) -> Self
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        let delay = duration_until(run_at);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await
        });
        Self { handle }
    }

    /// Cancel the task. Returns true iff it had already completed before we
    /// could cancel it.
    pub async fn cancel(self) -> bool {
        self.handle.abort();
        self.handle.await.is_ok()
    }
}

/// How long from now until the given instant; zero if it has already passed.
fn duration_until(instant: DateTime<Utc>) -> Duration {
    let millis = instant.timestamp_millis() - Utc::now().timestamp_millis();
    Duration::from_millis(u64::try_from(millis).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_instants_give_zero_delay() {
        let past = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(duration_until(past), Duration::from_millis(0));
    }

    #[rocket::async_test]
    async fn cancelled_tasks_do_not_run() {
        let task = ScheduledTask::new(async { 42 }, Utc::now() + chrono::Duration::hours(1));
        assert!(!task.cancel().await);
    }

    #[rocket::async_test]
    async fn due_tasks_run_to_completion() {
        let task = ScheduledTask::new(async { 42 }, Utc::now() - chrono::Duration::hours(1));
        let result = task.handle.await.unwrap();
        assert_eq!(result, 42);
    }
}
