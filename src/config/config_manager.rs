// ==========================================
// SINAPI 目录同步 - 配置管理器
// ==========================================
// 职责: 读写 config_kv 表中的运行期覆写，并叠加到 PipelineConfig
// 存储: config_kv 表 (scope_id + key → value)
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::pipeline_config::PipelineConfig;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use tracing::info;

/// 配置键常量
pub mod config_keys {
    pub const DUPLICATE_POLICY: &str = "duplicate_policy";
    pub const DEACTIVATION_KEYWORDS: &str = "deactivation_keywords"; // JSON 数组
    pub const TIE_BREAK: &str = "tie_break";
    pub const FACT_BATCH_SIZE: &str = "fact_batch_size";
    pub const CREATE_PLACEHOLDERS: &str = "create_placeholders";
}

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager<'a> {
    conn: &'a Connection,
}

impl<'a> ConfigManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
            ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 全部 global 配置的快照
    pub fn get_config_snapshot(&self) -> ConfigResult<HashMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    /// 将 config_kv 中的覆写叠加到运行配置上
    ///
    /// # 返回
    /// - Ok(n): 生效的覆写项数量
    pub fn apply_overrides(&self, config: &mut PipelineConfig) -> ConfigResult<usize> {
        let mut applied = 0;

        if let Some(v) = self.get_global_config_value(config_keys::DUPLICATE_POLICY)? {
            config.duplicate_policy = parse_override(config_keys::DUPLICATE_POLICY, &v)?;
            applied += 1;
        }
        if let Some(v) = self.get_global_config_value(config_keys::DEACTIVATION_KEYWORDS)? {
            config.deactivation_keywords =
                serde_json::from_str::<Vec<String>>(&v).map_err(|e| ConfigError::InvalidValue {
                    key: config_keys::DEACTIVATION_KEYWORDS.to_string(),
                    value: v.clone(),
                    message: e.to_string(),
                })?;
            applied += 1;
        }
        if let Some(v) = self.get_global_config_value(config_keys::TIE_BREAK)? {
            config.tie_break = parse_override(config_keys::TIE_BREAK, &v)?;
            applied += 1;
        }
        if let Some(v) = self.get_global_config_value(config_keys::FACT_BATCH_SIZE)? {
            config.fact_batch_size = parse_override(config_keys::FACT_BATCH_SIZE, &v)?;
            applied += 1;
        }
        if let Some(v) = self.get_global_config_value(config_keys::CREATE_PLACEHOLDERS)? {
            config.create_placeholders = parse_override(config_keys::CREATE_PLACEHOLDERS, &v)?;
            applied += 1;
        }

        if applied > 0 {
            info!(applied, "已应用 config_kv 覆写");
        }
        config.validate()?;
        Ok(applied)
    }
}

fn parse_override<T>(key: &str, raw: &str) -> ConfigResult<T>
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
