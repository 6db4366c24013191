use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub featured_limit: i64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    pub api_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

/// TMDB import. `api_key` is the v4 read access token sent as a bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub image_base_url: String,
    /// Pause between outbound requests; batches wait five times as long.
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p/w500".to_string(),
            request_delay_ms: 200,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    pub security: Option<SecurityConfig>,
    #[serde(default)]
    pub tmdb: TmdbConfig,
}

impl AppConfig {
    /// The configured API secret, if it is set to something other than whitespace.
    pub fn api_secret(&self) -> Option<&str> {
        self.auth.api_secret.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// The TMDB token, if one is set to something other than whitespace.
    pub fn tmdb_api_key(&self) -> Option<&str> {
        self.tmdb.api_key.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: filmregal.toml (in CWD)
        .add_source(::config::File::with_name("filmregal").required(false));

    if let Ok(custom_path) = std::env::var("FILMREGAL_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(
        ::config::Environment::with_prefix("FILMREGAL")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("cors.allowed_origins")
            .try_parsing(true),
    );

    let cfg = builder.build()?;
    let mut app_cfg: AppConfig = cfg.try_deserialize()?;
    // Plain TMDB_API_KEY is honoured when the prefixed variable is unset
    if app_cfg.tmdb_api_key().is_none() {
        if let Ok(key) = std::env::var("TMDB_API_KEY") {
            app_cfg.tmdb.api_key = Some(key);
        }
    }
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub(crate) fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!(
            "Using privileged port {} - may require elevated permissions",
            cfg.server.port
        );
    }

    let c = &cfg.catalog;
    if c.default_page_size <= 0 {
        return Err(anyhow::anyhow!("catalog.default_page_size must be > 0"));
    }
    if c.max_page_size <= 0 {
        return Err(anyhow::anyhow!("catalog.max_page_size must be > 0"));
    }
    if c.default_page_size > c.max_page_size {
        return Err(anyhow::anyhow!("catalog.default_page_size must be <= max_page_size"));
    }
    if c.featured_limit <= 0 {
        return Err(anyhow::anyhow!("catalog.featured_limit must be > 0"));
    }

    if cfg.tmdb.base_url.trim().is_empty() {
        return Err(anyhow::anyhow!("tmdb.base_url must not be empty"));
    }
    if cfg.tmdb.timeout_secs == 0 {
        return Err(anyhow::anyhow!("tmdb.timeout_secs must be > 0"));
    }

    if cfg.api_secret().is_none() {
        tracing::warn!("auth.api_secret is not set - all write requests will be rejected");
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        // On Windows, handle URLs like sqlite:///C:/... by stripping the leading '/'
        #[cfg(windows)]
        let path = {
            let bytes = path.as_bytes();
            if bytes.len() >= 3
                && bytes[0] == b'/'
                && bytes[2] == b':'
                && bytes[1].is_ascii_alphabetic()
            {
                &path[1..]
            } else {
                path
            }
        };
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
