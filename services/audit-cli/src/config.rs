//! Configuration types and loading
//!
//! Precedence: env vars > config file > defaults. The file is found via
//! `--config`, then `CONFIG_PATH`, then `audit-cli.toml`; only the implicit
//! default may be missing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use audit_client::{ClientConfig, RetryPolicy};
use audit_limiter::{Presets, RateLimitOptions};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "audit-cli.toml";
const DEFAULT_TOKEN_FILE: &str = "~/.audit-cli/tokens.json";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
}

/// Backend connection settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: audit_auth::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub token_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            token_file: DEFAULT_TOKEN_FILE.to_string(),
        }
    }
}

/// Optional overrides of the limiter presets
#[derive(Debug, Default, Deserialize)]
pub struct LimitsConfig {
    pub api: Option<LimitOverride>,
    pub auth: Option<LimitOverride>,
    pub chat: Option<LimitOverride>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitOverride {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl LimitOverride {
    fn apply(&self, preset: RateLimitOptions) -> RateLimitOptions {
        RateLimitOptions {
            max_requests: self.max_requests,
            window: Duration::from_secs(self.window_secs),
            ..preset
        }
    }
}

impl Config {
    /// Load from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Load from the resolved path. A missing file is an error only when the
    /// path was given explicitly.
    pub fn load_resolved(cli_path: Option<&str>) -> common::Result<Self> {
        let explicit = cli_path.is_some() || std::env::var_os("CONFIG_PATH").is_some();
        let path = Self::resolve_path(cli_path);
        if !explicit && !path.exists() {
            return Config::default().finish();
        }
        Self::load(&path)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    fn finish(mut self) -> common::Result<Self> {
        if let Ok(url) = std::env::var("AUDIT_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(file) = std::env::var("AUDIT_TOKEN_FILE") {
            self.storage.token_file = file;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(common::Error::Config(
                "max_attempts must be greater than 0".into(),
            ));
        }
        if self.storage.token_file.trim().is_empty() {
            return Err(common::Error::Config("token_file must not be empty".into()));
        }
        for (name, limit) in [
            ("api", &self.limits.api),
            ("auth", &self.limits.auth),
            ("chat", &self.limits.chat),
        ] {
            if let Some(limit) = limit {
                if limit.max_requests == 0 || limit.window_secs == 0 {
                    return Err(common::Error::Config(format!(
                        "limits.{name}: max_requests and window_secs must be greater than 0"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    pub fn presets(&self) -> Presets {
        let pick = |limit: &Option<LimitOverride>, preset: RateLimitOptions| match limit {
            Some(limit) => limit.apply(preset),
            None => preset,
        };
        Presets::new(
            pick(&self.limits.api, RateLimitOptions::api()),
            pick(&self.limits.auth, RateLimitOptions::auth()),
            pick(&self.limits.chat, RateLimitOptions::chat()),
        )
    }

    /// Token file path with a leading `~/` expanded from `HOME`.
    pub fn token_file(&self) -> PathBuf {
        let raw = self.storage.token_file.as_str();
        match (raw.strip_prefix("~/"), std::env::var_os("HOME")) {
            (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
            _ => PathBuf::from(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn clear_overrides() {
        unsafe {
            remove_env("AUDIT_API_URL");
            remove_env("AUDIT_TOKEN_FILE");
            remove_env("CONFIG_PATH");
        }
    }

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit-cli.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let (_dir, path) = write_config(
            r#"
[api]
base_url = "https://audit.example"
timeout_secs = 30

[retry]
max_attempts = 5
base_delay_ms = 250

[storage]
token_file = "/var/lib/audit/tokens.json"

[limits.chat]
max_requests = 40
window_secs = 20
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://audit.example");
        assert_eq!(config.client_config().timeout, Duration::from_secs(30));
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(5, Duration::from_millis(250))
        );
        assert_eq!(config.token_file(), PathBuf::from("/var/lib/audit/tokens.json"));

        let presets = config.presets();
        assert_eq!(presets.chat.options().max_requests, 40);
        assert_eq!(presets.chat.options().window, Duration::from_secs(20));
        assert_eq!(
            presets.chat.options().error_message,
            RateLimitOptions::chat().error_message
        );
        assert_eq!(presets.auth.options().max_requests, 5);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let (_dir, path) = write_config("");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.presets().api.options().max_requests, 100);
    }

    #[test]
    fn test_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let (_dir, path) = write_config("[api]\nbase_url = \"https://from-file\"\n");

        unsafe {
            set_env("AUDIT_API_URL", "http://from-env:9000");
            set_env("AUDIT_TOKEN_FILE", "/tmp/env-tokens.json");
        }
        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "http://from-env:9000");
        assert_eq!(config.token_file(), PathBuf::from("/tmp/env-tokens.json"));
        clear_overrides();
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let (_dir, path) = write_config("[api]\nbase_url = \"localhost:8000\"\n");

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(
            err.contains("base_url must start with http"),
            "error message should explain the issue, got: {err}"
        );
    }

    #[test]
    fn test_zero_values_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        for contents in [
            "[api]\ntimeout_secs = 0\n",
            "[retry]\nmax_attempts = 0\n",
            "[limits.auth]\nmax_requests = 0\nwindow_secs = 300\n",
        ] {
            let (_dir, path) = write_config(contents);
            assert!(Config::load(&path).is_err(), "should reject: {contents}");
        }
    }

    #[test]
    fn test_load_invalid_toml() {
        let (_dir, path) = write_config("not valid {{{{ toml");
        assert!(matches!(Config::load(&path), Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_missing_default_file_yields_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let result = Config::load_resolved(None);
        std::env::set_current_dir(previous).unwrap();

        assert_eq!(result.unwrap().api.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let result = Config::load_resolved(Some("/nonexistent/path/audit-cli.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_resolve_path_precedence() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        assert_eq!(Config::resolve_path(None), PathBuf::from("audit-cli.toml"));

        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("/env/path.toml"));
        assert_eq!(
            Config::resolve_path(Some("/cli/wins.toml")),
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
        clear_overrides();
    }

    #[test]
    fn test_token_file_expands_home() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let config = Config::default();
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                config.token_file(),
                PathBuf::from(home).join(".audit-cli/tokens.json")
            );
        }
    }
}
