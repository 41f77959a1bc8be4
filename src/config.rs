use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;

const MIN_MAX_FILE_SIZE: usize = 1024 * 1024;
const MIN_CHUNK_SIZE_FLOOR: usize = 100;

/// Flat environment names accepted alongside the `APP__SECTION__KEY` form.
const FLAT_ENV: &[(&str, &str)] = &[
    ("TESTING", "testing"),
    ("PORT", "server.port"),
    ("DEBUG", "server.debug"),
    ("DATABASE_URL", "database.url"),
    ("DATABASE_NAME", "database.name"),
    ("MAX_FILE_SIZE", "processing.max_file_size"),
    ("CHUNK_SIZE", "processing.chunk_size"),
    ("CHUNK_OVERLAP", "processing.chunk_overlap"),
    ("MIN_CHUNK_SIZE", "processing.min_chunk_size"),
    ("OPENAI_API_KEY", "ai.openai_api_key"),
    ("ANTHROPIC_API_KEY", "ai.anthropic_api_key"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
];

const FLAT_LIST_ENV: &[(&str, &str)] = &[
    ("ALLOWED_ORIGINS", "server.allowed_origins"),
    ("ALLOWED_FILE_TYPES", "processing.allowed_file_types"),
    ("ALLOWED_FILE_EXTENSIONS", "processing.allowed_file_extensions"),
];

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub processing: ProcessingConfig,
    pub ai: AiConfig,
    pub logging: LoggingConfig,
    /// Run against the in-process document store instead of PostgreSQL.
    #[serde(default)]
    pub testing: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Overrides the database named in `url` when set.
    pub name: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessingConfig {
    pub max_file_size: usize,
    pub allowed_file_types: Vec<String>,
    pub allowed_file_extensions: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_size: usize,
}

/// Provider keys reserved for summarisation and quiz generation.
#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    pub openai_api_key: String,
    pub anthropic_api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `compact` or `json`; see [`LoggingConfig::log_format`].
    pub format: String,
}

impl LoggingConfig {
    /// `None` for anything unrecognised, such as a Python logging format string.
    pub fn log_format(&self) -> Option<LogFormat> {
        self.format.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {other}")),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let vars: Map<String, String> = std::env::vars().collect();
        Self::from_env(&vars)
    }

    /// Layers `config/default`, `config/{RUN_ENV}`, `APP__*` variables and the
    /// flat variable names taken from `vars`, then validates the result.
    pub fn from_env(vars: &Map<String, String>) -> Result<Self, ConfigError> {
        let environment = vars
            .get("RUN_ENV")
            .cloned()
            .unwrap_or_else(|| "development".into());

        let mut builder = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .with_list_parse_key("processing.allowed_file_types")
                    .with_list_parse_key("processing.allowed_file_extensions")
                    .source(Some(vars.clone())),
            );

        for (var, key) in FLAT_ENV {
            if let Some(value) = vars.get(*var) {
                builder = builder.set_override(*key, value.as_str())?;
            }
        }

        for (var, key) in FLAT_LIST_ENV {
            if let Some(value) = vars.get(*var) {
                builder = builder.set_override(*key, parse_list(value))?;
            }
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Message("DATABASE_URL is required".into()));
        }

        let processing = &self.processing;
        if processing.max_file_size < MIN_MAX_FILE_SIZE {
            return Err(ConfigError::Message(
                "MAX_FILE_SIZE should be at least 1MB".into(),
            ));
        }

        if processing.chunk_size < MIN_CHUNK_SIZE_FLOOR {
            return Err(ConfigError::Message(format!(
                "CHUNK_SIZE should be at least {MIN_CHUNK_SIZE_FLOOR} characters"
            )));
        }

        if processing.chunk_overlap >= processing.chunk_size {
            return Err(ConfigError::Message(
                "CHUNK_OVERLAP must be smaller than CHUNK_SIZE".into(),
            ));
        }

        if processing.min_chunk_size > processing.chunk_size {
            return Err(ConfigError::Message(
                "MIN_CHUNK_SIZE must not exceed CHUNK_SIZE".into(),
            ));
        }

        Ok(())
    }
}

/// Accepts either a JSON array (`["a", "b"]`) or a comma separated string.
fn parse_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
            return items;
        }
    }

    trimmed
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(|item| item.trim().trim_matches('"').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
