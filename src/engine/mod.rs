// ==========================================
// SINAPI 目录同步 - 引擎层
// ==========================================
// 职责: 各同步阶段的业务规则与运行编排
// 红线: 引擎不拼 SQL，数据访问全部经由 repository
// ==========================================

pub mod catalog_upserter;
pub mod coordinator;
pub mod error;
pub mod fact_loader;
pub mod history_ingestor;
pub mod placeholder;
pub mod status_sync;
pub mod structure_reloader;

// 重导出核心引擎
pub use catalog_upserter::CatalogUpserter;
pub use coordinator::RunCoordinator;
pub use error::{RecordError, SyncError, SyncResult};
pub use fact_loader::FactLoader;
pub use history_ingestor::HistoryIngestor;
pub use placeholder::{plan_placeholders, PLACEHOLDER_UNIT};
pub use status_sync::{derive_status, latest_event, DeactivationMatcher, StatusSynchronizer};
pub use structure_reloader::StructureReloader;
