// ==========================================
// SINAPI 目录同步 - 配置错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("缺少必填配置: {0}")]
    Missing(String),

    #[error("配置文件读取失败 ({path}): {message}")]
    FileRead { path: String, message: String },

    #[error("配置解析失败 ({source_name}): {message}")]
    Parse { source_name: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("配置读取失败 (key: {key}): {message}")]
    StoreRead { key: String, message: String },
}

impl From<rusqlite::Error> for ConfigError {
    fn from(err: rusqlite::Error) -> Self {
        ConfigError::StoreRead {
            key: "config_kv".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
