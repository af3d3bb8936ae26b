pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::{AppState, CommandResponse, SessionSnapshot, TimerTickResponse};
pub use application::scheduler::{spawn_background_tasks, BackgroundTasks};
pub use infrastructure::config::AppConfig;
pub use infrastructure::error::InfraError;

/// Installs the global fmt subscriber. `RUST_LOG` overrides the default
/// `info` level. Calling it again is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
