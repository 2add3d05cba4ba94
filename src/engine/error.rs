// ==========================================
// SINAPI 目录同步 - 引擎错误类型
// ==========================================
// 分层:
// - RecordError: 行级缺陷，收集后继续处理本批次
// - SyncError: 阶段级失败，终止运行（已提交阶段保持提交）
// ==========================================

use crate::config::ConfigError;
use crate::domain::{ItemKind, RecordRejection, RejectionKind, RunState, SyncPhase};
use crate::repository::RepositoryError;
use thiserror::Error;

// ==========================================
// RecordError - 行级错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("行 {row}: 字段 {field} {message}")]
    Malformed {
        row: usize,
        field: &'static str,
        message: String,
    },

    #[error("行 {row}: 引用了不存在的{kind}编码 {code}")]
    ReferentialIntegrity { row: usize, kind: ItemKind, code: i64 },
}

impl RecordError {
    pub fn missing(row: usize, field: &'static str) -> Self {
        RecordError::Malformed {
            row,
            field,
            message: "缺失或非法".to_string(),
        }
    }

    pub fn duplicate(row: usize, field: &'static str) -> Self {
        RecordError::Malformed {
            row,
            field,
            message: "与本批次先前行重复".to_string(),
        }
    }

    pub fn row(&self) -> usize {
        match self {
            RecordError::Malformed { row, .. } | RecordError::ReferentialIntegrity { row, .. } => *row,
        }
    }

    pub fn kind(&self) -> RejectionKind {
        match self {
            RecordError::Malformed { .. } => RejectionKind::MalformedRecord,
            RecordError::ReferentialIntegrity { .. } => RejectionKind::ReferentialIntegrity,
        }
    }

    /// 转为运行报告中的拒绝记录
    pub fn into_rejection(self, phase: SyncPhase, table: &str) -> RecordRejection {
        RecordRejection {
            phase,
            table: table.to_string(),
            row_number: self.row(),
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

// ==========================================
// SyncError - 运行级错误
// ==========================================
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("阶段 {phase} 执行失败: {source}")]
    PhaseExecution {
        phase: SyncPhase,
        #[source]
        source: RepositoryError,
    },

    #[error("运行已取消 (最后完成状态: {last_completed})")]
    Cancelled { last_completed: RunState },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SyncError {
    pub fn phase(phase: SyncPhase) -> impl FnOnce(RepositoryError) -> SyncError {
        move |source| SyncError::PhaseExecution { phase, source }
    }
}

/// Result 类型别名
pub type SyncResult<T> = Result<T, SyncError>;
