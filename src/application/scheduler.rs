use crate::application::commands::{
    check_day_rollover_impl, expire_notifications_impl, flush_focus_impl, tick_timer_impl,
    AppState,
};
use crate::infrastructure::error::InfraError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const NOTIFICATION_SWEEP_INTERVAL: Duration = Duration::from_millis(250);

/// Handles of the periodic jobs. Dropping the value stops them.
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn shutdown(mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Starts the timer tick, the focus flush, the day rollover check and
/// the notification sweep on the current tokio runtime.
pub fn spawn_background_tasks(state: Arc<AppState>) -> BackgroundTasks {
    let config = state.config().clone();
    let handles = vec![
        spawn_loop(
            state.clone(),
            Duration::from_millis(config.tick_interval_ms),
            "tick_timer",
            |state| tick_timer_impl(state).map(|_| ()),
        ),
        spawn_loop(
            state.clone(),
            Duration::from_secs(u64::from(config.focus_commit_interval_seconds)),
            "flush_focus",
            |state| flush_focus_impl(state).map(|_| ()),
        ),
        spawn_loop(
            state.clone(),
            Duration::from_secs(config.day_check_interval_seconds),
            "check_day_rollover",
            |state| check_day_rollover_impl(state).map(|_| ()),
        ),
        spawn_loop(
            state,
            NOTIFICATION_SWEEP_INTERVAL,
            "expire_notifications",
            |state| {
                let expired = expire_notifications_impl(state)?;
                if expired > 0 {
                    debug!(expired, "notifications expired");
                }
                Ok(())
            },
        ),
    ];
    BackgroundTasks { handles }
}

fn spawn_loop<F>(state: Arc<AppState>, period: Duration, name: &'static str, job: F) -> JoinHandle<()>
where
    F: Fn(&AppState) -> Result<(), InfraError> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(error) = job(&state) {
                warn!(job = name, %error, "background job failed");
            }
        }
    })
}
