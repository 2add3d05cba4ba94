// ==========================================
// SINAPI 目录同步 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 参考期目录同步与时态装载引擎
// 阶段顺序: History → Status → Catalog → Structure → Facts
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 类型、输入记录、运行报告
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 同步阶段与编排
pub mod engine;

// 提取适配层 - 表格文件
pub mod importer;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/schema）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    DuplicatePolicy, FactKind, ItemKind, ItemStatus, Regime, RunState, RunStatus, SyncPhase,
    TieBreak,
};

// 输入记录与运行汇总
pub use domain::{PeriodExtract, PhaseReport, RecordRejection, ReferenceExtract, RunSummary};

// 引擎
pub use engine::{
    CatalogUpserter, FactLoader, HistoryIngestor, RunCoordinator, StatusSynchronizer,
    StructureReloader, SyncError,
};

// 配置与提取
pub use config::{ConfigManager, PipelineConfig};
pub use importer::{DirectoryExtractSource, ExtractSource};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "SINAPI 目录同步";
