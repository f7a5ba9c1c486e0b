use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    pub log_dir: String,
    pub enable_admin_routes: bool,
    /// When set, admin routes are served only on this address instead of the main listener.
    pub admin_bind: Option<String>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    port: Option<u16>,
    database_max_connections: Option<u32>,
    log_dir: Option<String>,
    enable_admin_routes: Option<bool>,
    admin_bind: Option<String>,
}

fn default_database_url() -> String {
    "postgres://localhost:5432/habits".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    10
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            port: default_port(),
            max_connections: default_max_connections(),
            log_dir: default_log_dir(),
            enable_admin_routes: false,
            admin_bind: None,
        }
    }
}

impl PartialServerConfig {
    fn from_file(config_path: Option<&str>) -> Result<Self, String> {
        let Some(path_str) = config_path else {
            return Ok(Self::default());
        };
        let path = Path::new(path_str);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
    }
}

fn env_error(e: envy::Error) -> String {
    format!("Failed to load config from environment: {e}")
}

impl ServerConfig {
    /// Loads configuration: defaults, then the optional TOML file, then environment
    /// variables (including a `.env` file), later sources overriding earlier ones.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();
        let env_config = envy::from_env::<PartialServerConfig>().map_err(env_error)?;
        Self::layer(config_path, env_config)
    }

    /// Same layering as [`ServerConfig::load`], reading variables from `vars`
    /// instead of the process environment.
    pub fn load_from_vars<I>(config_path: Option<&str>, vars: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env_config = envy::from_iter::<_, PartialServerConfig>(vars).map_err(env_error)?;
        Self::layer(config_path, env_config)
    }

    fn layer(config_path: Option<&str>, env_config: PartialServerConfig) -> Result<Self, String> {
        let file_config = PartialServerConfig::from_file(config_path)?;

        // Merge: environment overrides file
        Ok(ServerConfig {
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .unwrap_or_else(default_database_url),
            port: env_config.port.or(file_config.port).unwrap_or_else(default_port),
            max_connections: env_config
                .database_max_connections
                .or(file_config.database_max_connections)
                .unwrap_or_else(default_max_connections),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            enable_admin_routes: env_config
                .enable_admin_routes
                .or(file_config.enable_admin_routes)
                .unwrap_or(false),
            admin_bind: env_config
                .admin_bind
                .or(file_config.admin_bind)
                .filter(|addr| !addr.trim().is_empty()),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn admin_routes_enabled(&self) -> bool {
        self.enable_admin_routes || self.admin_bind.is_some()
    }

    /// Admin routes share the public listener only when enabled without a dedicated bind address.
    pub fn admin_on_main_listener(&self) -> bool {
        self.enable_admin_routes && self.admin_bind.is_none()
    }
}
