use crate::infrastructure::config::{ensure_default_configs, load_config, AppConfig};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BootstrapResult {
    pub database_path: PathBuf,
    pub config: AppConfig,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let database_path = state_dir.join("focusdeck.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;

    ensure_default_configs(&config_dir)?;
    let config = load_config(&config_dir)?;
    initialize_database(&database_path)?;

    Ok(BootstrapResult {
        database_path,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_creates_layout() {
        let root = std::env::temp_dir().join(format!("focusdeck-bootstrap-{}", std::process::id()));
        let result = bootstrap_workspace(&root).expect("bootstrap");

        assert!(root.join("config").join("app.json").exists());
        assert!(root.join("state").is_dir());
        assert!(!root.join("logs").exists());
        assert!(result.database_path.exists());
        assert_eq!(result.config, AppConfig::default());
        let _ = fs::remove_dir_all(&root);
    }
}
