//! Server configuration

/// Port used when `TASKTREE_PORT` is unset
pub const DEFAULT_PORT: u16 = 3001;

/// Origins allowed when `CORS_ALLOW_ORIGIN` is unset
const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:1420", "http://localhost:5173"];

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,

    /// Browser origins allowed by the CORS layer
    pub cors_allow_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            cors_allow_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

impl ServerConfig {
    /// Build configuration from the environment.
    ///
    /// - `TASKTREE_PORT` (default 3001)
    /// - `CORS_ALLOW_ORIGIN`, a comma-separated list of origins
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("TASKTREE_PORT") {
            config.port = raw
                .parse()
                .map_err(|_| format!("TASKTREE_PORT must be a port number, got '{}'", raw))?;
        }
        if let Some(raw) = lookup("CORS_ALLOW_ORIGIN") {
            config.cors_allow_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }
        if self.cors_allow_origins.is_empty() {
            return Err("at least one CORS origin is required".to_string());
        }
        if let Some(bad) = self
            .cors_allow_origins
            .iter()
            .find(|o| !o.starts_with("http://") && !o.starts_with("https://"))
        {
            return Err(format!("invalid CORS origin '{}'", bad));
        }
        Ok(())
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }
}
