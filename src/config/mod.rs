use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
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
    pub backend: Option<BackendConfig>,
    pub submission: SubmissionConfig,
    pub sessions: SessionConfig,
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

        let request_timeout_secs = env::var("INTAKE_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        let backend = match env::var("INTAKE_BACKEND_URL") {
            Ok(url) if !url.trim().is_empty() => Some(BackendConfig {
                base_url: url.trim().trim_end_matches('/').to_string(),
                api_key: env::var("INTAKE_BACKEND_KEY").unwrap_or_default(),
                table: env::var("INTAKE_TABLE").unwrap_or_else(|_| "applications".to_string()),
                request_timeout: Duration::from_secs(request_timeout_secs),
            }),
            _ => None,
        };

        let success_route =
            env::var("INTAKE_SUCCESS_ROUTE").unwrap_or_else(|_| "/?submitted=true".to_string());
        let redirect_delay_ms = env::var("INTAKE_REDIRECT_DELAY_MS")
            .unwrap_or_else(|_| "1500".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidRedirectDelay)?;

        let idle_ttl_secs = env::var("INTAKE_SESSION_IDLE_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidSessionLimit)?;
        let capacity = env::var("INTAKE_MAX_SESSIONS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidSessionLimit)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            backend,
            submission: SubmissionConfig {
                success_route,
                redirect_delay: Duration::from_millis(redirect_delay_ms),
            },
            sessions: SessionConfig {
                idle_ttl: Duration::from_secs(idle_ttl_secs),
                capacity,
            },
        })
    }

    /// Backend settings for commands that must reach the hosted table.
    pub fn backend(&self) -> Result<&BackendConfig, ConfigError> {
        self.backend.as_ref().ok_or(ConfigError::MissingBackendUrl)
    }
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

/// Connection details for the hosted applications table.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub request_timeout: Duration,
}

/// What happens after the backend acknowledges a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionConfig {
    pub success_route: String,
    pub redirect_delay: Duration,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            success_route: "/?submitted=true".to_string(),
            redirect_delay: Duration::from_millis(1500),
        }
    }
}

/// Bounds on the in-memory session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sessions untouched for longer than this are evicted.
    pub idle_ttl: Duration,
    /// Open sessions allowed at once; opening beyond this is refused.
    pub capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(3600),
            capacity: 10_000,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidRedirectDelay,
    InvalidSessionLimit,
    MissingBackendUrl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "INTAKE_REQUEST_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidRedirectDelay => {
                write!(f, "INTAKE_REDIRECT_DELAY_MS must be a whole number of milliseconds")
            }
            ConfigError::InvalidSessionLimit => {
                write!(f, "INTAKE_SESSION_IDLE_SECS and INTAKE_MAX_SESSIONS must be whole numbers")
            }
            ConfigError::MissingBackendUrl => {
                write!(f, "INTAKE_BACKEND_URL must be set to submit applications")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
