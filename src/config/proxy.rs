use crate::config::substitute_env_vars;
use crate::core::fetch::RetryPolicy;
use crate::domain::ports::ProxyConfigProvider;
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::{validate_identifier, validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default = "default_true")]
    pub expose_backend_url: bool,
    /// 開啟後 4xx 以原狀態碼回傳，而非一律 500
    #[serde(default)]
    pub propagate_client_errors: bool,
    /// 路由名稱 -> 上游 base URL（/api/<route> 轉發到此）
    #[serde(default)]
    pub routes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            attempt_timeout: Duration::from_secs(self.timeout_seconds),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ProxyConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BridgeError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        let mut config: ProxyConfig = toml::from_str(&processed)?;
        if config.routes.is_empty() {
            config.routes = Self::default_routes(&|_: &str| None);
        }
        Ok(config)
    }

    /// BACKEND_URL 與 UMKM_/ADMIN_/LOCATION_BACKEND_URL 各自覆蓋對應的資料服務
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            bind: lookup("PROXY_BIND").unwrap_or_else(default_bind),
            retry: RetrySettings::default(),
            expose_backend_url: true,
            propagate_client_errors: false,
            routes: Self::default_routes(&lookup),
        }
    }

    fn default_routes(lookup: &dyn Fn(&str) -> Option<String>) -> BTreeMap<String, String> {
        let main = lookup("BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let main = main.trim_end_matches('/').to_string();
        let service = |env_key: &str, path: &str| {
            let base = lookup(env_key).unwrap_or_else(|| main.clone());
            format!("{}{}", base.trim_end_matches('/'), path)
        };

        let mut routes = BTreeMap::new();
        routes.insert("backend".to_string(), format!("{}/api", main));
        routes.insert("umkm".to_string(), service("UMKM_BACKEND_URL", "/api/umkm"));
        routes.insert("admin".to_string(), service("ADMIN_BACKEND_URL", "/api/admin"));
        routes.insert(
            "location".to_string(),
            service("LOCATION_BACKEND_URL", "/api/location"),
        );
        routes
    }

    /// 以命令列指定的 URL 覆蓋主要後端路由
    pub fn override_backend(&mut self, backend_url: &str) {
        let base = backend_url.trim_end_matches('/');
        self.routes
            .insert("backend".to_string(), format!("{}/api", base));
    }
}

impl ProxyConfigProvider for ProxyConfig {
    fn upstream_for(&self, route: &str) -> Option<&str> {
        self.routes.get(route).map(String::as_str)
    }

    fn route_names(&self) -> Vec<String> {
        self.routes.keys().cloned().collect()
    }

    fn propagate_client_errors(&self) -> bool {
        self.propagate_client_errors
    }

    fn expose_backend_url(&self) -> bool {
        self.expose_backend_url
    }
}

impl Validate for ProxyConfig {
    fn validate(&self) -> Result<()> {
        self.bind
            .parse::<std::net::SocketAddr>()
            .map_err(|e| BridgeError::InvalidConfigValueError {
                field: "bind".to_string(),
                value: self.bind.clone(),
                reason: e.to_string(),
            })?;

        validate_range("retry.max_retries", self.retry.max_retries, 1, 10)?;
        validate_range("retry.timeout_seconds", self.retry.timeout_seconds, 1, 300)?;
        validate_range("retry.base_delay_ms", self.retry.base_delay_ms, 0, 60_000)?;

        if self.routes.is_empty() {
            return Err(BridgeError::MissingConfigError {
                field: "routes".to_string(),
            });
        }
        for (name, url) in &self.routes {
            validate_identifier("routes", name)?;
            validate_url(&format!("routes.{}", name), url)?;
        }
        Ok(())
    }
}
