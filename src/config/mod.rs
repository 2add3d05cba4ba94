// ==========================================
// SINAPI 目录同步 - 配置层
// ==========================================
// 职责: 运行配置加载（JSON / 环境变量）+ config_kv 覆写
// ==========================================

pub mod config_manager;
pub mod error;
pub mod pipeline_config;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use error::{ConfigError, ConfigResult};
pub use pipeline_config::{
    PipelineConfig, DEFAULT_DEACTIVATION_KEYWORDS, DEFAULT_FACT_BATCH_SIZE,
};
