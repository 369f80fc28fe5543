//! 统一配置中心
//!
//! 提供中继服务的全局配置管理，包括：
//! - 监听地址与跨域
//! - 持久化网关（内存或 PostgreSQL）
//! - 连接存活检测
//! - WebSocket 帧大小
//!
//! 加载顺序：默认值 -> 可选配置文件（`RELAY_CONFIG_FILE`）-> 环境变量（`RELAY_*`，
//! 嵌套字段用 `__` 分隔，例如 `RELAY_SERVER__PORT`）。

use std::time::Duration;

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "RELAY_";
/// 指定配置文件路径的环境变量
pub const CONFIG_FILE_ENV: &str = "RELAY_CONFIG_FILE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 持久化后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

/// 启动时写入持久化网关的用户资料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SeedUser {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub fullname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_storage"))]
pub struct StorageConfig {
    pub backend: StorageBackend,
    #[serde(default)]
    pub database_url: Option<String>,
    #[validate(range(min = 1))]
    pub max_connections: u32,
    /// 已存在的同ID用户会被覆盖
    #[serde(default)]
    #[validate(nested)]
    pub seed_users: Vec<SeedUser>,
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ValidationError> {
    if storage.backend == StorageBackend::Postgres
        && storage
            .database_url
            .as_deref()
            .map_or(true, |url| url.trim().is_empty())
    {
        return Err(ValidationError::new("database_url_required"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_heartbeat"))]
pub struct HeartbeatConfig {
    pub enabled: bool,
    #[validate(range(min = 1))]
    pub interval_seconds: u64,
    #[validate(range(min = 1))]
    pub timeout_seconds: u64,
}

fn validate_heartbeat(heartbeat: &HeartbeatConfig) -> Result<(), ValidationError> {
    if heartbeat.timeout_seconds <= heartbeat.interval_seconds {
        return Err(ValidationError::new("timeout_must_exceed_interval"));
    }
    Ok(())
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WebSocketConfig {
    /// 单个入站帧的最大字节数
    #[validate(range(min = 1024))]
    pub max_message_size: usize,
}

/// 全局应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub storage: StorageConfig,
    #[validate(nested)]
    pub heartbeat: HeartbeatConfig,
    #[validate(nested)]
    pub websocket: WebSocketConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8000,
                cors_origins: vec!["*".into()],
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                database_url: None,
                max_connections: 10,
                seed_users: Vec::new(),
            },
            heartbeat: HeartbeatConfig {
                enabled: true,
                interval_seconds: 30,
                timeout_seconds: 90,
            },
            websocket: WebSocketConfig {
                max_message_size: 64 * 1024,
            },
        }
    }
}

impl AppConfig {
    /// 按 默认值 -> 配置文件 -> 环境变量 的优先级加载并校验
    pub fn load() -> Result<Self, ConfigError> {
        let mut fig = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            fig = merge_file(fig, &path);
        }
        fig = fig.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(fig)
    }

    /// 从指定文件加载（不读取环境变量）
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let fig = merge_file(
            Figment::new().merge(Serialized::defaults(AppConfig::default())),
            path,
        );
        Self::extract(fig)
    }

    fn extract(fig: Figment) -> Result<Self, ConfigError> {
        let cfg: AppConfig = fig.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// 用于日志输出的脱敏表示
    pub fn sanitize(&self) -> String {
        let mut copy = self.clone();
        if copy.storage.database_url.is_some() {
            copy.storage.database_url = Some("[REDACTED]".to_string());
        }
        format!("{copy:?}")
    }
}

fn merge_file(fig: Figment, path: &str) -> Figment {
    if path.ends_with(".yml") || path.ends_with(".yaml") {
        fig.merge(Yaml::file(path))
    } else if path.ends_with(".json") {
        fig.merge(Json::file(path))
    } else {
        fig.merge(Toml::file(path))
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}
