use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENVIRONMENTS: [&str; 2] = ["local", "production"];

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    #[serde(default)]
    pub uploads: UploadSettings,
    pub log_level: LogLevel,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Attach the error chain of a failed prediction to the response body.
    #[serde(default = "default_include_traceback")]
    pub include_traceback: bool,
    /// Upload size cap in bytes. Unset means no limit at all.
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,
}

fn default_include_traceback() -> bool {
    true
}

impl ServerSettings {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelSettings {
    pub model_dir: PathBuf,
    pub model_file: String,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
    #[serde(default)]
    pub labels_file: Option<String>,
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ModelSettings {
    pub fn get_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    pub fn get_labels_path(&self) -> Option<PathBuf> {
        self.labels_file
            .as_ref()
            .map(|file| self.model_dir.join(file))
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.get_model_path().exists() {
            return Err(format!("Model file not found: {:?}", self.get_model_path()));
        }
        if self.num_instances == 0 {
            return Err("model.num_instances must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UploadSettings {
    pub directory: Option<PathBuf>,
}

impl UploadSettings {
    pub fn get_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Reads `configuration/` in the working directory, picking the overlay
/// named by `APP_ENVIRONMENT` (default `local`).
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no working directory: {}", e)))?;
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".into());

    load_configuration(&base_path.join("configuration"), &environment)
}

pub fn load_configuration(
    configuration_directory: &Path,
    environment: &str,
) -> Result<Settings, config::ConfigError> {
    let environment = environment.to_lowercase();
    if !ENVIRONMENTS.contains(&environment.as_str()) {
        return Err(config::ConfigError::Message(format!(
            "{} is not a supported environment. Use either `local` or `production`.",
            environment
        )));
    }

    config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment)),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<Settings>()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}
