// ==========================================
// SINAPI 目录同步 - 组合结构重载器
// ==========================================
// 职责: 以本期结构整体替换当前结构（两张边表）
// 规则:
// - 清空 + 写入在同一事务内完成，失败则回滚到旧结构
// - 父项须为已知组合，子项须为对应类别的已知条目，否则按行拒绝
// - 批内同一 (父, 子, 类别) 重复时首行生效
// 统计: 与旧结构比对，区分新增 / 系数变化 / 不变 / 移除
// ==========================================

use crate::domain::{ItemKind, PhaseReport, StructureEdge, StructureEdgeRecord, SyncPhase};
use crate::engine::error::RecordError;
use crate::repository::{CatalogRepository, RepositoryResult, StructureRepository};
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

#[derive(Debug, Default)]
pub struct StructureReloader;

impl StructureReloader {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(record: &StructureEdgeRecord) -> Result<StructureEdge, RecordError> {
        let row = record.row_number;
        let parent_code = record
            .parent_code
            .filter(|c| *c > 0)
            .ok_or_else(|| RecordError::missing(row, "parent_code"))?;
        let child_code = record
            .child_code
            .filter(|c| *c > 0)
            .ok_or_else(|| RecordError::missing(row, "child_code"))?;
        let child_kind = record
            .child_kind
            .ok_or_else(|| RecordError::missing(row, "child_kind"))?;
        let coefficient = record
            .coefficient
            .filter(|c| c.is_finite() && *c >= 0.0)
            .ok_or_else(|| RecordError::missing(row, "coefficient"))?;

        if child_kind == ItemKind::Assembly && child_code == parent_code {
            return Err(RecordError::Malformed {
                row,
                field: "child_code",
                message: "组合不能引用自身".to_string(),
            });
        }

        Ok(StructureEdge {
            parent_code,
            child_code,
            child_kind,
            coefficient,
        })
    }

    /// 整体替换当前结构（单事务）
    #[instrument(skip_all, fields(edges = records.len()))]
    pub fn reload(
        &self,
        conn: &mut Connection,
        records: &[StructureEdgeRecord],
    ) -> RepositoryResult<PhaseReport> {
        let mut report = PhaseReport::new(SyncPhase::Structure);
        for kind in [ItemKind::Elementary, ItemKind::Assembly] {
            report.table_mut(kind.edge_table());
        }

        let tx = conn.transaction()?;
        {
            let catalog = CatalogRepository::new(&tx);
            let structure = StructureRepository::new(&tx);

            let elementary = catalog.codes(ItemKind::Elementary)?;
            let assemblies = catalog.codes(ItemKind::Assembly)?;
            let known = |kind: ItemKind, code: i64| match kind {
                ItemKind::Elementary => elementary.contains(&code),
                ItemKind::Assembly => assemblies.contains(&code),
            };

            let accepted = accept_edges(records, known, &mut report);

            let previous: HashMap<(i64, i64, ItemKind), f64> = structure
                .load_all()?
                .into_iter()
                .map(|e| (e.key(), e.coefficient))
                .collect();

            structure.clear_all()?;
            let mut retained = HashSet::new();
            for edge in &accepted {
                structure.insert(edge)?;

                let stats = report.table_mut(edge.child_kind.edge_table());
                match previous.get(&edge.key()) {
                    None => stats.inserted += 1,
                    Some(old) if (old - edge.coefficient).abs() > f64::EPSILON => {
                        stats.updated += 1
                    }
                    Some(_) => stats.skipped += 1,
                }
                retained.insert(edge.key());
            }

            for key in previous.keys().filter(|k| !retained.contains(*k)) {
                report.table_mut(key.2.edge_table()).deleted += 1;
            }
        }
        tx.commit()?;

        for stats in &report.tables {
            info!(
                table = %stats.table,
                inserted = stats.inserted,
                updated = stats.updated,
                deleted = stats.deleted,
                unchanged = stats.skipped,
                rejected = stats.rejected,
                "组合结构重载完成"
            );
        }
        Ok(report)
    }
}

/// 校验、批内去重与引用完整性检查；拒绝写入报告
fn accept_edges<F>(
    records: &[StructureEdgeRecord],
    known: F,
    report: &mut PhaseReport,
) -> Vec<StructureEdge>
where
    F: Fn(ItemKind, i64) -> bool,
{
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(records.len());

    for record in records {
        // 类别未知时计入组合-基础边表
        let table = record
            .child_kind
            .unwrap_or(ItemKind::Elementary)
            .edge_table();

        let checked = StructureReloader::validate(record).and_then(|edge| {
            if !known(ItemKind::Assembly, edge.parent_code) {
                return Err(RecordError::ReferentialIntegrity {
                    row: record.row_number,
                    kind: ItemKind::Assembly,
                    code: edge.parent_code,
                });
            }
            if !known(edge.child_kind, edge.child_code) {
                return Err(RecordError::ReferentialIntegrity {
                    row: record.row_number,
                    kind: edge.child_kind,
                    code: edge.child_code,
                });
            }
            if !seen.insert(edge.key()) {
                return Err(RecordError::duplicate(record.row_number, "parent_code/child_code"));
            }
            Ok(edge)
        });

        match checked {
            Ok(edge) => accepted.push(edge),
            Err(e) => {
                warn!(table, row = record.row_number, error = %e, "结构边被拒绝");
                report.reject(table, e.into_rejection(SyncPhase::Structure, table));
            }
        }
    }
    accepted
}
