//! `load_config`: builds the explicit [`AppConfig`] handed to the workflow.
//!
//! Static settings come from an optional YAML file; secrets and deployment
//! overrides come from the environment (a `.env` file is loaded by `main`).
//!
//! # Environment variables
//! - `OPENROUTER_API_KEY`: generation service credential. Not required at
//!   startup, but every generation request fails fast without it.
//! - `PORT`, `CORS_ORIGIN`, `APP_ENV` (`development` | `production`),
//!   `ZENDOCS_DATA_DIR`
//! - `STORAGE_URL`, `STORAGE_KEY`, `STORAGE_BUCKET`: remote object store.
//!   Without `STORAGE_URL` renderings are published to a local directory.
//!
//! # Errors
//! All errors use `anyhow::Error` and surface at the CLI boundary.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::discover::DEFAULT_EXTENSIONS;
use crate::generate::PipelineSettings;
use crate::openrouter::GeneratorSettings;
use crate::render::RenderTheme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

/// Where published renderings go.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local {
        dir: PathBuf,
        public_base_url: String,
    },
    Http {
        base_url: String,
        bucket: String,
        api_key: SecretString,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<SecretString>,
    pub port: u16,
    pub allowed_origin: String,
    pub environment: Environment,
    pub data_dir: PathBuf,
    pub extensions: Vec<String>,
    pub pipeline: PipelineSettings,
    pub generator: GeneratorSettings,
    pub storage: StorageConfig,
    pub theme: RenderTheme,
}

impl AppConfig {
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn parsed_code_dir(&self) -> PathBuf {
        self.data_dir.join("parsed_code")
    }

    pub fn generated_docs_dir(&self) -> PathBuf {
        self.data_dir.join("generated_docs")
    }

    pub fn renderings_dir(&self) -> PathBuf {
        self.data_dir.join("renderings")
    }

    /// Defaults for everything, rooted at `data_dir`. Used by tests and as the
    /// base the YAML file and environment are layered onto.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let port = 5000;
        Self {
            api_key: None,
            port,
            allowed_origin: "http://localhost:5173".to_string(),
            environment: Environment::Development,
            storage: StorageConfig::Local {
                dir: data_dir.join("published"),
                public_base_url: format!("http://localhost:{port}/files"),
            },
            data_dir,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            pipeline: PipelineSettings::default(),
            generator: GeneratorSettings::default(),
            theme: RenderTheme::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    port: Option<u16>,
    allowed_origin: Option<String>,
    environment: Option<Environment>,
    data_dir: Option<PathBuf>,
    extensions: Option<Vec<String>>,
    pipeline: PipelineSection,
    generator: GeneratorSection,
    storage: StorageSection,
    theme: Option<RenderTheme>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PipelineSection {
    pacing_ms: Option<u64>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeneratorSection {
    api_base: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    referer: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StorageSection {
    url: Option<String>,
    bucket: Option<String>,
    local_dir: Option<PathBuf>,
    public_base_url: Option<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Loads the configuration from an optional YAML file plus the environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let file: FileConfig = match path {
        Some(path) => {
            info!(config_path = ?path, "Loading configuration from file");
            let content = fs::read_to_string(path).map_err(|e| {
                error!(error = ?e, config_path = ?path, "Failed to read config file");
                anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
            })?;
            serde_yaml::from_str(&content).map_err(|e| {
                error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
                anyhow::anyhow!("Failed to parse config YAML: {e}")
            })?
        }
        None => FileConfig::default(),
    };

    let data_dir = env_var("ZENDOCS_DATA_DIR")
        .map(PathBuf::from)
        .or(file.data_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut config = AppConfig::with_data_dir(data_dir);

    config.port = match env_var("PORT") {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("PORT must be a valid port number, got {raw:?}"))?,
        None => file.port.unwrap_or(config.port),
    };
    if let Some(origin) = env_var("CORS_ORIGIN").or(file.allowed_origin) {
        config.allowed_origin = origin;
    }
    config.environment = env_var("APP_ENV")
        .map(|v| Environment::parse(&v))
        .or(file.environment)
        .unwrap_or(config.environment);
    if let Some(extensions) = file.extensions {
        config.extensions = extensions;
    }

    if let Some(ms) = file.pipeline.pacing_ms {
        config.pipeline.pacing_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = file.pipeline.timeout_ms {
        config.pipeline.request_timeout = Duration::from_millis(ms);
    }
    config.generator.timeout = config.pipeline.request_timeout;

    let g = file.generator;
    if let Some(v) = g.api_base {
        config.generator.api_base = v;
    }
    if let Some(v) = g.model {
        config.generator.model = v;
    }
    if let Some(v) = g.max_tokens {
        config.generator.max_tokens = v;
    }
    if let Some(v) = g.temperature {
        config.generator.temperature = v;
    }
    config.generator.referer = g
        .referer
        .unwrap_or_else(|| format!("http://localhost:{}", config.port));
    if let Some(v) = g.title {
        config.generator.title = v;
    }

    if let Some(theme) = file.theme {
        config.theme = theme;
    }

    config.api_key = env_var("OPENROUTER_API_KEY").map(SecretString::from);
    if config.api_key.is_none() {
        info!("OPENROUTER_API_KEY not set; generation requests will be rejected");
    }

    let storage = file.storage;
    config.storage = match env_var("STORAGE_URL").or(storage.url) {
        Some(base_url) => {
            let api_key = env_var("STORAGE_KEY")
                .context("STORAGE_KEY environment variable not set while STORAGE_URL is")?;
            StorageConfig::Http {
                base_url,
                bucket: env_var("STORAGE_BUCKET")
                    .or(storage.bucket)
                    .unwrap_or_else(|| "documentation".to_string()),
                api_key: SecretString::from(api_key),
            }
        }
        None => StorageConfig::Local {
            dir: storage
                .local_dir
                .unwrap_or_else(|| config.data_dir.join("published")),
            public_base_url: storage
                .public_base_url
                .unwrap_or_else(|| format!("http://localhost:{}/files", config.port)),
        },
    };

    info!(
        port = config.port,
        environment = ?config.environment,
        data_dir = %config.data_dir.display(),
        extensions = ?config.extensions,
        "Configuration loaded"
    );
    Ok(config)
}
