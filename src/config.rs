use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Prefix for layered environment overrides, e.g. `PORTAL_SERVER__PORT=8080`.
const ENV_PREFIX: &str = "PORTAL";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Backend base URL for server-side calls
    #[arg(long, env = "BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Backend base URL as seen from the browser origin
    #[arg(long, env = "PUBLIC_API_BASE")]
    pub public_api_base: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the web front end (default)
    Serve,
    /// Ask a question against one of your RAGs and stream the answer
    Ask {
        /// RAG identifier
        #[arg(long)]
        rag: String,
        /// Session token issued at sign-in
        #[arg(long, env = "RAG_PORTAL_SESSION", hide_env_values = true)]
        session: String,
        /// Question text
        query: String,
    },
    /// List the RAGs owned by the signed-in user
    Rags {
        /// Session token issued at sign-in
        #[arg(long, env = "RAG_PORTAL_SESSION", hide_env_values = true)]
        session: String,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub gate: GateConfig,
    pub resilience: ResilienceConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL for server-side calls (session checks, proxies).
    pub url: String,
    /// Base URL for browser-origin calls; falls back to `url`.
    #[serde(default)]
    pub public_url: Option<String>,
    pub session_check_timeout_secs: u64,
}

impl BackendConfig {
    pub fn public_url(&self) -> &str {
        self.public_url.as_deref().unwrap_or(&self.url)
    }

    pub fn session_check_timeout(&self) -> Duration {
        Duration::from_secs(self.session_check_timeout_secs)
    }
}

/// Routing rules for the session gate.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GateConfig {
    pub cookie_name: String,
    pub signin_path: String,
    pub signup_path: String,
    pub landing_path: String,
    /// Exact paths of the sign-in and sign-up pages.
    pub auth_pages: Vec<String>,
    /// Prefixes guarding a page and all of its descendants.
    pub protected_prefixes: Vec<String>,
    /// Prefixes that skip the gate entirely.
    pub bypass_prefixes: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session".to_string(),
            signin_path: "/signin".to_string(),
            signup_path: "/signup".to_string(),
            landing_path: "/dashboard".to_string(),
            auth_pages: vec!["/signin".to_string(), "/signup".to_string()],
            protected_prefixes: vec!["/dashboard".to_string(), "/settings".to_string()],
            bypass_prefixes: vec!["/static".to_string(), "/api".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub timeout_disabled: bool,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Build the layered configuration.
    ///
    /// Priority: CLI flag > flag env var > `PORTAL_*` env > config file > defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default("backend.url", "http://localhost:8000")?
            .set_default("backend.session_check_timeout_secs", 5)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.request_timeout_secs", 30)?
            .set_default("log.json", false)?;

        match &cli.config {
            Some(path) => builder = builder.add_source(File::with_name(path)),
            None if Path::new("config.yaml").exists() => {
                builder = builder.add_source(File::with_name("config.yaml").required(false));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(url) = &cli.backend_url {
            builder = builder.set_override("backend.url", url.as_str())?;
        }
        if let Some(url) = &cli.public_api_base {
            builder = builder.set_override("backend.public_url", url.as_str())?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("log.json", json)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        for (key, value) in [
            ("backend.url", self.backend.url.as_str()),
            ("backend.public_url", self.backend.public_url()),
        ] {
            url::Url::parse(value).map_err(|e| {
                config::ConfigError::Message(format!("{key} is not a valid URL ({value}): {e}"))
            })?;
        }
        if self.gate.cookie_name.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "gate.cookie_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        if self.resilience.timeout_disabled {
            Duration::from_secs(365 * 24 * 60 * 60)
        } else {
            Duration::from_secs(self.resilience.request_timeout_secs)
        }
    }
}
