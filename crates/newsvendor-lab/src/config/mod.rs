use crate::workflows::study::{DemandMode, FrameMode, StudyConfig, StudyConfigError};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub study: StudyConfig,
    pub sync: SyncConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let study = load_study_config()?;
        study.validate()?;

        let endpoint = env::var("STUDY_SYNC_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let timeout_secs: u64 = parse_var("STUDY_SYNC_TIMEOUT_SECS", 5)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            study,
            sync: SyncConfig {
                endpoint,
                timeout: Duration::from_secs(timeout_secs.max(1)),
            },
        })
    }
}

fn load_study_config() -> Result<StudyConfig, ConfigError> {
    let defaults = StudyConfig::default();

    let access_code = env::var("STUDY_ACCESS_CODE").unwrap_or(defaults.access_code);
    let price = parse_var("STUDY_PRICE", defaults.price)?;
    let cost = parse_var("STUDY_COST", defaults.cost)?;
    let demand_min = parse_var("STUDY_DEMAND_MIN", defaults.demand_min)?;
    let demand_max = parse_var("STUDY_DEMAND_MAX", defaults.demand_max)?;
    let rounds = parse_var("STUDY_ROUNDS", defaults.rounds)?;

    let seed = match env::var("STUDY_DEMAND_SEED") {
        Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::InvalidNumber {
                variable: "STUDY_DEMAND_SEED",
                value: raw.clone(),
            }
        })?),
        _ => None,
    };

    let demand_mode = match env::var("STUDY_DEMAND_MODE")
        .unwrap_or_else(|_| "random".to_string())
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "random" | "uniform" => DemandMode::Random { seed },
        "fixed" | "scripted" => {
            let raw = env::var("STUDY_DEMAND_SEQUENCE").unwrap_or_default();
            DemandMode::Fixed(parse_sequence(&raw)?)
        }
        other => return Err(ConfigError::InvalidDemandMode(other.to_string())),
    };

    let frame_mode = match env::var("STUDY_FRAME_MODE")
        .unwrap_or_else(|_| "random".to_string())
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "random" => FrameMode::Random,
        "group" => FrameMode::Group,
        other => return Err(ConfigError::InvalidFrameMode(other.to_string())),
    };

    Ok(StudyConfig {
        access_code,
        price,
        cost,
        demand_min,
        demand_max,
        rounds,
        demand_mode,
        frame_mode,
    })
}

fn parse_var<T: FromStr>(variable: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber {
                variable,
                value: raw,
            }),
        Err(_) => Ok(default),
    }
}

/// Parses a comma-separated demand list such as `123, 67, 142`.
pub fn parse_sequence(raw: &str) -> Result<Vec<u32>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidNumber {
                    variable: "STUDY_DEMAND_SEQUENCE",
                    value: value.to_string(),
                })
        })
        .collect()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Outbound collection endpoint for finished sessions.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str, value: String },
    InvalidDemandMode(String),
    InvalidFrameMode(String),
    Study(StudyConfigError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a non-negative integer, got '{value}'")
            }
            ConfigError::InvalidDemandMode(value) => write!(
                f,
                "STUDY_DEMAND_MODE must be 'random' or 'fixed', got '{value}'"
            ),
            ConfigError::InvalidFrameMode(value) => write!(
                f,
                "STUDY_FRAME_MODE must be 'random' or 'group', got '{value}'"
            ),
            ConfigError::Study(err) => write!(f, "invalid study parameters: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Study(err) => Some(err),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidDemandMode(_)
            | ConfigError::InvalidFrameMode(_) => None,
        }
    }
}

impl From<StudyConfigError> for ConfigError {
    fn from(value: StudyConfigError) -> Self {
        Self::Study(value)
    }
}
