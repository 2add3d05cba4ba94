// ==========================================
// SINAPI 目录同步 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化；仓储只借用连接，不持有
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod catalog_repo;
pub mod error;
pub mod fact_repo;
pub mod history_repo;
pub mod structure_repo;

// 重导出核心仓储
pub use catalog_repo::{CatalogRepository, UpsertOutcome};
pub use error::{RepositoryError, RepositoryResult};
pub use fact_repo::FactRepository;
pub use history_repo::HistoryRepository;
pub use structure_repo::{StructureRepository, DEFAULT_MAX_EXPLOSION_DEPTH};

use rusqlite::types::Type;
use rusqlite::Row;
use std::str::FromStr;

/// 将文本列解析为领域枚举（ItemKind / ItemStatus 等）
pub(crate) fn parse_text_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
