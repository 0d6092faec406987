use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{Config, ValidationResult};

/// Main application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
    validation: ValidationResult,
}

impl App {
    /// Load and validate the configuration in `config_dir` (or the default
    /// directory) and build the application around it
    pub fn open(config_dir: Option<&Path>) -> Result<Self> {
        let (config, validation) = Config::load_validated(config_dir)?;
        Self::with_config(config, validation)
    }

    /// Create an application instance from an already-loaded configuration
    pub fn with_config(config: Config, validation: ValidationResult) -> Result<Self> {
        std::fs::create_dir_all(&config.config_dir).with_context(|| {
            format!(
                "Failed to create config directory {}",
                config.config_dir.display()
            )
        })?;

        tracing::info!(
            "Application configured (config dir: {}, {} warnings)",
            config.config_dir.display(),
            validation.warnings.len()
        );

        Ok(Self {
            config: Arc::new(config),
            validation,
        })
    }

    /// Shutdown the application
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");
        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the configuration
    pub fn shared_config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Warnings collected while loading the configuration
    pub fn warnings(&self) -> &ValidationResult {
        &self.validation
    }

    /// Where the local weather database lives
    pub fn database_path(&self) -> PathBuf {
        self.config.database_path()
    }
}
