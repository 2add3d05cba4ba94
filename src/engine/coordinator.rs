// ==========================================
// SINAPI 目录同步 - 运行编排器
// ==========================================
// 用途: 按固定顺序驱动五个阶段并产出运行汇总
// 顺序: History → Status → Catalog → Structure → Facts
// 状态机:
//   PENDING → HISTORY_LOADED → STATUS_SYNCED → CATALOG_UPSERTED
//     → STRUCTURE_RELOADED → FACTS_LOADED → DONE
//   任一非终态可转入 FAILED
// 红线:
// - 前一阶段成功提交后才启动下一阶段
// - 失败不回滚已提交阶段，汇总中给出最后完成状态
// - 连接由编排器独占，各阶段仅在调用期间借用
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::{
    PeriodExtract, PhaseReport, ReferenceExtract, RunState, RunStatus, RunSummary, SyncPhase,
    TableStats,
};
use crate::engine::catalog_upserter::CatalogUpserter;
use crate::engine::error::{SyncError, SyncResult};
use crate::engine::fact_loader::FactLoader;
use crate::engine::history_ingestor::HistoryIngestor;
use crate::engine::status_sync::StatusSynchronizer;
use crate::engine::structure_reloader::StructureReloader;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

// ==========================================
// RunCoordinator - 运行编排器
// ==========================================
pub struct RunCoordinator {
    conn: Connection,
    config: PipelineConfig,
    period: NaiveDate,
    cancel: Arc<AtomicBool>,
}

impl RunCoordinator {
    /// 创建编排器（配置先行校验）
    pub fn new(conn: Connection, config: PipelineConfig) -> SyncResult<Self> {
        config.validate()?;
        let period = config.reference_date()?;
        Ok(Self {
            conn,
            config,
            period,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 使用外部取消标志（阶段之间检查）
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cancellation_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn period(&self) -> NaiveDate {
        self.period
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// 执行一次完整同步
    ///
    /// # 返回
    /// - 运行汇总；阶段失败体现在 status = FAILURE，不以 Err 返回
    pub fn run(&mut self, extract: &PeriodExtract) -> RunSummary {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("sync_run", run_id = %run_id, reference_date = %self.period);
        let _guard = span.enter();

        info!("==================================================");
        info!(
            history_events = extract.history.len(),
            has_reference = extract.reference.is_some(),
            policy = %self.config.duplicate_policy,
            "开始同步运行"
        );

        let mut state = RunState::Pending;
        let mut reports: Vec<PhaseReport> = Vec::new();
        let mut failure: Option<SyncError> = None;
        let mut no_data = false;

        while let Some(phase) = state.next_phase() {
            if self.cancel.load(Ordering::SeqCst) {
                failure = Some(SyncError::Cancelled {
                    last_completed: state,
                });
                break;
            }

            let reference = extract.reference.as_ref();
            if requires_reference(phase) && reference.is_none() {
                no_data = true;
                info!(phase = %phase, "本期无参考数据，跳过其余阶段");
                break;
            }

            debug!(phase = %phase, from = %state, "阶段开始");
            match self.execute(phase, extract, reference) {
                Ok(report) => {
                    state = phase.completed_state();
                    info!(phase = %phase, state = %state, rejected = report.rejections.len(), "阶段完成");
                    reports.push(report);
                }
                Err(e) => {
                    error!(phase = %phase, last_completed = %state, error = %e, "阶段失败，运行终止");
                    failure = Some(e);
                    break;
                }
            }
        }

        let summary = self.summarize(run_id, state, reports, failure, no_data);
        log_summary(&summary);
        summary
    }

    fn execute(
        &mut self,
        phase: SyncPhase,
        extract: &PeriodExtract,
        reference: Option<&ReferenceExtract>,
    ) -> SyncResult<PhaseReport> {
        let conn = &mut self.conn;
        let result = match (phase, reference) {
            (SyncPhase::History, _) => HistoryIngestor::new().ingest(conn, &extract.history),
            (SyncPhase::Status, _) => StatusSynchronizer::from_config(&self.config).synchronize(conn),
            (SyncPhase::Catalog, Some(reference)) => {
                CatalogUpserter::new(self.config.create_placeholders).upsert(conn, reference)
            }
            (SyncPhase::Structure, Some(reference)) => {
                StructureReloader::new().reload(conn, &reference.edges)
            }
            (SyncPhase::Facts, Some(reference)) => {
                FactLoader::new(self.config.duplicate_policy, self.config.fact_batch_size)
                    .load_reference(conn, reference, self.period)
            }
            (_, None) => Ok(PhaseReport::new(phase)),
        };
        result.map_err(SyncError::phase(phase))
    }

    fn summarize(
        &self,
        run_id: String,
        last_completed: RunState,
        reports: Vec<PhaseReport>,
        failure: Option<SyncError>,
        no_data: bool,
    ) -> RunSummary {
        let mut table_stats: Vec<TableStats> = Vec::new();
        let mut rejections = Vec::new();
        for report in reports {
            for stats in &report.tables {
                match table_stats.iter_mut().find(|t| t.table == stats.table) {
                    Some(existing) => existing.merge(stats),
                    None => table_stats.push(stats.clone()),
                }
            }
            rejections.extend(report.rejections);
        }

        let records_inserted = table_stats.iter().map(|t| t.inserted).sum();
        let tables_updated = table_stats
            .iter()
            .filter(|t| t.touched())
            .map(|t| t.table.clone())
            .collect();

        let (status, final_state, message) = match failure {
            Some(e) => (RunStatus::Failure, RunState::Failed, e.to_string()),
            None if no_data => (
                RunStatus::SuccessNoData,
                RunState::Done,
                format!("{} 无参考数据，仅同步维护历史与状态", self.period.format("%Y-%m")),
            ),
            None if rejections.is_empty() => (RunStatus::Success, RunState::Done, "同步完成".to_string()),
            None => (
                RunStatus::Success,
                RunState::Done,
                format!("同步完成，{} 行被排除", rejections.len()),
            ),
        };

        RunSummary {
            run_id,
            reference_date: self.period,
            status,
            message,
            records_inserted,
            tables_updated,
            last_completed_phase: last_completed,
            final_state,
            table_stats,
            rejections,
        }
    }
}

fn requires_reference(phase: SyncPhase) -> bool {
    matches!(
        phase,
        SyncPhase::Catalog | SyncPhase::Structure | SyncPhase::Facts
    )
}

fn log_summary(summary: &RunSummary) {
    info!("==================================================");
    match summary.status {
        RunStatus::Failure => error!(
            last_completed = %summary.last_completed_phase,
            message = %summary.message,
            "同步运行失败"
        ),
        _ => info!(
            status = %summary.status,
            records_inserted = summary.records_inserted,
            tables_updated = summary.tables_updated.len(),
            last_completed = %summary.last_completed_phase,
            "同步运行结束"
        ),
    }
    if summary.has_rejections() {
        warn!(rejected = summary.rejections.len(), "存在被排除的行，详见运行汇总");
    }
    info!("==================================================");
}
