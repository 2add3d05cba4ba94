// ==========================================
// SINAPI 目录同步 - 领域模型层
// ==========================================
// 职责: 定义领域类型、输入记录、持久化实体、运行报告
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod catalog;
pub mod records;
pub mod run;
pub mod types;

// 重导出核心类型
pub use catalog::{
    CatalogEntry, CatalogItem, ExplodedComponent, FactKey, HistoryEvent, NewHistoryEvent,
    RegionalFact, StructureEdge,
};
pub use records::{
    CatalogRow, HistoryEventRecord, PeriodExtract, ReferenceExtract, RegionalFactRecord,
    StructureEdgeRecord,
};
pub use run::{PhaseReport, RecordRejection, RejectionKind, RunSummary, TableStats};
pub use types::{
    DuplicatePolicy, FactKind, ItemKind, ItemStatus, ParseEnumError, Regime, RunState,
    RunStatus, SyncPhase, TieBreak,
};
