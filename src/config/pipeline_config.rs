// ==========================================
// SINAPI 目录同步 - 运行配置
// ==========================================
// 来源: JSON 配置文件 或 环境变量（SINAPI_*）
// 覆写: ConfigManager 从 config_kv 表读取运行期覆写
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::{DuplicatePolicy, TieBreak};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 默认的停用维护类型词表（大小写不敏感的子串匹配）
pub const DEFAULT_DEACTIVATION_KEYWORDS: [&str; 3] = ["DESATIVACAO", "DESATIVAÇÃO", "DEACTIVATION"];

/// 事实写入的默认批大小
pub const DEFAULT_FACT_BATCH_SIZE: usize = 5_000;

/// 默认数据库文件名
pub const DEFAULT_DB_FILE: &str = "sinapi_sync.db";

fn default_keywords() -> Vec<String> {
    DEFAULT_DEACTIVATION_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

fn default_batch_size() -> usize {
    DEFAULT_FACT_BATCH_SIZE
}

// ==========================================
// PipelineConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    #[serde(default = "default_keywords")]
    pub deactivation_keywords: Vec<String>,
    #[serde(default)]
    pub tie_break: TieBreak,
    #[serde(default = "default_batch_size")]
    pub fact_batch_size: usize,
    #[serde(default)]
    pub create_placeholders: bool,
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub extract_dir: Option<String>,
}

impl PipelineConfig {
    /// 以默认值构造指定参考期的配置
    pub fn for_period(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            duplicate_policy: DuplicatePolicy::default(),
            deactivation_keywords: default_keywords(),
            tie_break: TieBreak::default(),
            fact_batch_size: DEFAULT_FACT_BATCH_SIZE,
            create_placeholders: false,
            db_path: None,
            extract_dir: None,
        }
    }

    /// 从 JSON 文件加载
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: PipelineConfig = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 从环境变量加载
    ///
    /// # 环境变量
    /// - SINAPI_YEAR / SINAPI_MONTH: 参考期（必填）
    /// - SINAPI_POLICY: replace|substituir|aggregate|agregar
    /// - SINAPI_DEACTIVATION_KEYWORDS: 逗号分隔
    /// - SINAPI_TIE_BREAK / SINAPI_BATCH_SIZE / SINAPI_PLACEHOLDERS
    /// - SINAPI_DB_PATH / SINAPI_EXTRACT_DIR
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载（from_env 的可测试形式）
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> ConfigResult<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::Missing(key.to_string()))
        };

        let year: i32 = parse_value("SINAPI_YEAR", &required("SINAPI_YEAR")?)?;
        let month: u32 = parse_value("SINAPI_MONTH", &required("SINAPI_MONTH")?)?;
        let mut config = Self::for_period(year, month);

        if let Some(v) = lookup("SINAPI_POLICY") {
            config.duplicate_policy = parse_value("SINAPI_POLICY", &v)?;
        }
        if let Some(v) = lookup("SINAPI_DEACTIVATION_KEYWORDS") {
            config.deactivation_keywords = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = lookup("SINAPI_TIE_BREAK") {
            config.tie_break = parse_value("SINAPI_TIE_BREAK", &v)?;
        }
        if let Some(v) = lookup("SINAPI_BATCH_SIZE") {
            config.fact_batch_size = parse_value("SINAPI_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("SINAPI_PLACEHOLDERS") {
            config.create_placeholders = matches!(
                v.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "sim"
            );
        }
        config.db_path = lookup("SINAPI_DB_PATH").filter(|v| !v.trim().is_empty());
        config.extract_dir = lookup("SINAPI_EXTRACT_DIR").filter(|v| !v.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    /// 校验取值范围
    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=12).contains(&self.month) {
            return Err(ConfigError::InvalidValue {
                key: "month".to_string(),
                value: self.month.to_string(),
                message: "月份须在 1..=12".to_string(),
            });
        }
        if self.fact_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fact_batch_size".to_string(),
                value: "0".to_string(),
                message: "批大小须大于 0".to_string(),
            });
        }
        if self.deactivation_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "deactivation_keywords".to_string(),
                value: "[]".to_string(),
                message: "停用词表不能为空".to_string(),
            });
        }
        self.reference_date().map(|_| ())
    }

    /// 参考期首日
    pub fn reference_date(&self) -> ConfigResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| ConfigError::InvalidValue {
            key: "year/month".to_string(),
            value: format!("{}-{}", self.year, self.month),
            message: "无法构造参考日期".to_string(),
        })
    }

    /// 数据库路径（未配置时使用用户数据目录）
    pub fn resolved_db_path(&self) -> String {
        if let Some(path) = &self.db_path {
            return path.clone();
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("sinapi-sync").join(DEFAULT_DB_FILE))
            .and_then(|p| p.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| DEFAULT_DB_FILE.to_string())
    }
}

fn parse_value<T>(key: &str, raw: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_json_file_applies_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"year": 2025, "month": 7, "duplicate_policy": "aggregate"}}"#).unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Aggregate);
        assert_eq!(config.fact_batch_size, DEFAULT_FACT_BATCH_SIZE);
        assert_eq!(config.tie_break, TieBreak::LastIngested);
        assert_eq!(config.reference_date().unwrap(), NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
    }

    #[test]
    fn test_from_lookup_reads_policy_alias_and_keywords() {
        let env: HashMap<&str, &str> = [
            ("SINAPI_YEAR", "2024"),
            ("SINAPI_MONTH", "12"),
            ("SINAPI_POLICY", "substituir"),
            ("SINAPI_DEACTIVATION_KEYWORDS", "desativação, EXCLUSAO"),
            ("SINAPI_BATCH_SIZE", "250"),
        ]
        .into_iter()
        .collect();

        let config = PipelineConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Replace);
        assert_eq!(config.deactivation_keywords, vec!["desativação", "EXCLUSAO"]);
        assert_eq!(config.fact_batch_size, 250);
    }

    #[test]
    fn test_missing_period_is_rejected() {
        let err = PipelineConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(key) if key == "SINAPI_YEAR"));
    }

    #[test]
    fn test_validate_rejects_bad_month_and_batch() {
        assert!(PipelineConfig::for_period(2025, 13).validate().is_err());

        let mut config = PipelineConfig::for_period(2025, 1);
        config.fact_batch_size = 0;
        assert!(config.validate().is_err());
    }
}
