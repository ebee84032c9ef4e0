//! 统一配置中心
//!
//! 配置按以下顺序叠加，后者覆盖前者：
//! - 内置默认值
//! - 工作目录下可选的 `config.yaml`
//! - `CHAT_` 前缀的环境变量，`__` 表示嵌套（例如 `CHAT_SERVER__PORT`）
//! - 兼容旧部署的 `PORT` 环境变量

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
}

/// 服务器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 持久化配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// users.json / rooms.json / messages.json 所在目录
    pub data_dir: PathBuf,
    /// 为 false 时完全运行在内存中
    pub persist: bool,
}

/// 实时会话配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 无入站活动超过该秒数的会话会被回收，0 表示关闭回收
    pub idle_timeout_secs: u64,
    pub reap_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
                persist: true,
            },
            session: SessionConfig {
                idle_timeout_secs: 0,
                reap_interval_secs: 30,
            },
        }
    }
}

impl SessionConfig {
    pub fn reaper_enabled(&self) -> bool {
        self.idle_timeout_secs > 0
    }
}

impl AppConfig {
    /// 组装配置来源
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file("config.yaml"))
            .merge(Env::prefixed("CHAT_").split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
    }

    /// 加载并校验配置
    pub fn load() -> Result<Self, ConfigError> {
        let config: AppConfig = Self::figment()
            .extract()
            .map_err(|err| ConfigError::Load(Box::new(err)))?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidServerConfig(
                "port must be greater than 0".to_string(),
            ));
        }

        if self.storage.persist && self.storage.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidStorageConfig(
                "data_dir cannot be empty when persistence is enabled".to_string(),
            ));
        }

        if self.session.reaper_enabled() && self.session.reap_interval_secs == 0 {
            return Err(ConfigError::InvalidSessionConfig(
                "reap_interval_secs must be greater than 0 when idle reaping is enabled"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(Box<figment::Error>),
    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),
    #[error("Invalid storage configuration: {0}")]
    InvalidStorageConfig(String),
    #[error("Invalid session configuration: {0}")]
    InvalidSessionConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_legacy_deployment() {
        Jail::expect_with(|_jail| {
            let config: AppConfig = AppConfig::figment().extract()?;
            assert_eq!(config.server.port, 3000);
            assert!(config.storage.persist);
            assert!(!config.session.reaper_enabled());
            assert!(config.validate().is_ok());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
server:
  port: 4000
storage:
  persist: false
session:
  idle_timeout_secs: 120
"#,
            )?;
            jail.set_env("CHAT_SERVER__PORT", "5000");

            let config: AppConfig = AppConfig::figment().extract()?;
            assert_eq!(config.server.port, 5000);
            assert!(!config.storage.persist);
            assert_eq!(config.session.idle_timeout_secs, 120);
            assert_eq!(config.session.reap_interval_secs, 30);
            Ok(())
        });
    }

    #[test]
    fn plain_port_variable_is_honoured() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "8088");
            let config: AppConfig = AppConfig::figment().extract()?;
            assert_eq!(config.server.port, 8088);
            Ok(())
        });
    }

    #[test]
    fn validation_rejects_inconsistent_values() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidServerConfig(_))
        ));

        let mut config = AppConfig::default();
        config.storage.data_dir = PathBuf::new();
        assert!(config.validate().is_err());
        config.storage.persist = false;
        assert!(config.validate().is_ok());

        let mut config = AppConfig::default();
        config.session.idle_timeout_secs = 60;
        config.session.reap_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSessionConfig(_))
        ));
    }
}
