// ==========================================
// SINAPI 目录同步 - 状态同步器
// ==========================================
// 职责: 由维护历史派生每个条目的当前生命周期状态，写回目录
// 规则:
// - 全量重算：历史中出现过的每个条目，而非仅本期条目
// - 取参考日期最新的事件；同日按 TieBreak 裁决（默认后写入者胜）
// - 维护类型命中停用词表（大小写不敏感子串）→ DEACTIVATED，否则 ACTIVE
// - 历史中不存在的条目保持原状态
// 红线: 状态是历史的纯归约结果，不做增量修改
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::{HistoryEvent, ItemKind, ItemStatus, PhaseReport, SyncPhase, TieBreak};
use crate::repository::{CatalogRepository, HistoryRepository, RepositoryResult};
use rusqlite::Connection;
use std::collections::BTreeMap;
use tracing::{info, instrument};

// ==========================================
// DeactivationMatcher - 停用维护类型匹配
// ==========================================
#[derive(Debug, Clone)]
pub struct DeactivationMatcher {
    keywords: Vec<String>,
}

impl DeactivationMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_uppercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn is_deactivation(&self, maintenance_type: &str) -> bool {
        let upper = maintenance_type.to_uppercase();
        self.keywords.iter().any(|k| upper.contains(k.as_str()))
    }
}

/// 选出条目的决定性事件
pub fn latest_event<'e>(
    events: &'e [HistoryEvent],
    tie_break: TieBreak,
    matcher: &DeactivationMatcher,
) -> Option<&'e HistoryEvent> {
    let latest_date = events.iter().map(|e| e.reference_date).max()?;
    let candidates: Vec<&HistoryEvent> = events
        .iter()
        .filter(|e| e.reference_date == latest_date)
        .collect();

    match tie_break {
        TieBreak::LastIngested => candidates.into_iter().max_by_key(|e| e.seq),
        TieBreak::FirstIngested => candidates.into_iter().min_by_key(|e| e.seq),
        TieBreak::PreferDeactivation => candidates
            .iter()
            .copied()
            .filter(|e| matcher.is_deactivation(&e.maintenance_type))
            .max_by_key(|e| e.seq)
            .or_else(|| candidates.iter().copied().max_by_key(|e| e.seq)),
    }
}

/// 由条目的全部历史归约出当前状态；无历史时返回 None
pub fn derive_status(
    events: &[HistoryEvent],
    tie_break: TieBreak,
    matcher: &DeactivationMatcher,
) -> Option<ItemStatus> {
    latest_event(events, tie_break, matcher).map(|e| {
        if matcher.is_deactivation(&e.maintenance_type) {
            ItemStatus::Deactivated
        } else {
            ItemStatus::Active
        }
    })
}

// ==========================================
// StatusSynchronizer
// ==========================================
#[derive(Debug, Clone)]
pub struct StatusSynchronizer {
    matcher: DeactivationMatcher,
    tie_break: TieBreak,
}

impl StatusSynchronizer {
    pub fn new(matcher: DeactivationMatcher, tie_break: TieBreak) -> Self {
        Self { matcher, tie_break }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            DeactivationMatcher::new(&config.deactivation_keywords),
            config.tie_break,
        )
    }

    /// 对全部历史分组归约，结果按 (类别, 编码) 排序
    pub fn derive_all(&self, events: &[HistoryEvent]) -> Vec<(ItemKind, i64, ItemStatus)> {
        let mut grouped: BTreeMap<(ItemKind, i64), Vec<HistoryEvent>> = BTreeMap::new();
        for event in events {
            grouped
                .entry((event.item_kind, event.item_code))
                .or_default()
                .push(event.clone());
        }

        grouped
            .into_iter()
            .filter_map(|((kind, code), item_events)| {
                derive_status(&item_events, self.tie_break, &self.matcher)
                    .map(|status| (kind, code, status))
            })
            .collect()
    }

    /// 全量重算并写回目录状态（单事务）
    #[instrument(skip_all)]
    pub fn synchronize(&self, conn: &mut Connection) -> RepositoryResult<PhaseReport> {
        let mut report = PhaseReport::new(SyncPhase::Status);

        let tx = conn.transaction()?;
        {
            let events = HistoryRepository::new(&tx).load_all_ordered()?;
            let derived = self.derive_all(&events);
            let catalog = CatalogRepository::new(&tx);

            let mut deactivated = 0usize;
            for (kind, code, status) in &derived {
                if *status == ItemStatus::Deactivated {
                    deactivated += 1;
                }
                let stats = report.table_mut(kind.catalog_table());
                if catalog.set_status(*kind, *code, *status)? > 0 {
                    stats.updated += 1;
                } else {
                    stats.skipped += 1;
                }
            }

            info!(
                items_with_history = derived.len(),
                deactivated,
                changed = report.tables.iter().map(|t| t.updated).sum::<usize>(),
                "目录状态同步完成"
            );
        }
        tx.commit()?;

        Ok(report)
    }
}
