// ==========================================
// SINAPI 目录同步 - 目录合并器
// ==========================================
// 职责: 将本期基础/组合目录合并进存储
// 规则:
// - 新编码插入（status 默认 ACTIVE）；已有编码仅更新描述字段
// - status 不在此阶段修改
// - 可选: 为结构边引用的未知编码补建占位行
// 失败: 编码缺失/非正、描述为空的行单独拒绝
// ==========================================

use crate::domain::{CatalogEntry, CatalogRow, ItemKind, PhaseReport, ReferenceExtract, SyncPhase};
use crate::engine::error::RecordError;
use crate::engine::placeholder::plan_placeholders;
use crate::repository::{CatalogRepository, RepositoryResult, UpsertOutcome};
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

#[derive(Debug, Default)]
pub struct CatalogUpserter {
    create_placeholders: bool,
}

impl CatalogUpserter {
    pub fn new(create_placeholders: bool) -> Self {
        Self { create_placeholders }
    }

    pub fn validate(row: &CatalogRow) -> Result<CatalogEntry, RecordError> {
        let code = row
            .code
            .filter(|c| *c > 0)
            .ok_or_else(|| RecordError::missing(row.row_number, "code"))?;
        let description = non_blank(row.description.as_deref())
            .ok_or_else(|| RecordError::missing(row.row_number, "description"))?;

        Ok(CatalogEntry {
            code,
            description,
            unit: non_blank(row.unit.as_deref()),
            classification: non_blank(row.classification.as_deref()),
        })
    }

    /// 合并本期目录（单事务，两类条目）
    #[instrument(skip_all, fields(
        elementary = reference.elementary.len(),
        assemblies = reference.assemblies.len()
    ))]
    pub fn upsert(
        &self,
        conn: &mut Connection,
        reference: &ReferenceExtract,
    ) -> RepositoryResult<PhaseReport> {
        let mut report = PhaseReport::new(SyncPhase::Catalog);

        let tx = conn.transaction()?;
        {
            let repo = CatalogRepository::new(&tx);
            upsert_kind(&repo, ItemKind::Elementary, &reference.elementary, &mut report)?;
            upsert_kind(&repo, ItemKind::Assembly, &reference.assemblies, &mut report)?;

            if self.create_placeholders {
                let elementary = repo.codes(ItemKind::Elementary)?;
                let assemblies = repo.codes(ItemKind::Assembly)?;
                let planned = plan_placeholders(&reference.edges, |kind| match kind {
                    ItemKind::Elementary => elementary.clone(),
                    ItemKind::Assembly => assemblies.clone(),
                });

                let mut created = 0usize;
                for (kind, entry) in &planned {
                    if repo.insert_if_absent(*kind, entry)? {
                        report.table_mut(kind.catalog_table()).inserted += 1;
                        created += 1;
                    }
                }
                if created > 0 {
                    warn!(created, "已为未知结构引用补建占位目录行");
                }
            }
        }
        tx.commit()?;

        for stats in &report.tables {
            info!(
                table = %stats.table,
                inserted = stats.inserted,
                updated = stats.updated,
                unchanged = stats.skipped,
                rejected = stats.rejected,
                "目录合并完成"
            );
        }
        Ok(report)
    }
}

fn upsert_kind(
    repo: &CatalogRepository<'_>,
    kind: ItemKind,
    rows: &[CatalogRow],
    report: &mut PhaseReport,
) -> RepositoryResult<()> {
    let table = kind.catalog_table();
    report.table_mut(table);

    let mut seen = HashSet::new();
    for row in rows {
        let entry = match CatalogUpserter::validate(row) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(table, row = row.row_number, error = %e, "目录行被拒绝");
                report.reject(table, e.into_rejection(SyncPhase::Catalog, table));
                continue;
            }
        };

        // 批内同码多行按出现顺序依次合并，后者生效；新增只计一次
        let first_time = seen.insert(entry.code);
        let stats = report.table_mut(table);
        match repo.upsert(kind, &entry)? {
            UpsertOutcome::Inserted => stats.inserted += 1,
            UpsertOutcome::Updated if first_time => stats.updated += 1,
            UpsertOutcome::Updated => {}
            UpsertOutcome::Unchanged => stats.skipped += 1,
        }
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
