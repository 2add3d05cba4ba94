// ==========================================
// SINAPI 目录同步 - 占位目录行规划
// ==========================================
// 场景: 结构边引用了本期目录与存储中均不存在的编码
// 规则: 父项一律为组合条目；子项按边上的类别
// 说明: 仅在 create_placeholders 打开时由目录阶段写入
// ==========================================

use crate::domain::{CatalogEntry, ItemKind, StructureEdgeRecord};
use std::collections::{BTreeMap, HashSet};

/// 占位行的默认单位
pub const PLACEHOLDER_UNIT: &str = "UN";

pub fn placeholder_description(kind: ItemKind, code: i64) -> String {
    format!("PLACEHOLDER {} {}", kind, code)
}

/// 规划需要补建的占位目录行
///
/// # 参数
/// - edges: 本期结构边
/// - known: 返回该类别已知编码集合（本期目录 + 存储）
///
/// # 返回
/// - 按 (类别, 编码) 去重排序的占位行；子项描述优先取边上的明细
pub fn plan_placeholders<F>(edges: &[StructureEdgeRecord], known: F) -> Vec<(ItemKind, CatalogEntry)>
where
    F: Fn(ItemKind) -> HashSet<i64>,
{
    let known_elementary = known(ItemKind::Elementary);
    let known_assembly = known(ItemKind::Assembly);
    let is_known = |kind: ItemKind, code: i64| match kind {
        ItemKind::Elementary => known_elementary.contains(&code),
        ItemKind::Assembly => known_assembly.contains(&code),
    };

    let mut planned: BTreeMap<(ItemKind, i64), CatalogEntry> = BTreeMap::new();
    for edge in edges {
        if let Some(parent) = edge.parent_code.filter(|c| *c > 0) {
            if !is_known(ItemKind::Assembly, parent) {
                planned
                    .entry((ItemKind::Assembly, parent))
                    .or_insert_with(|| CatalogEntry {
                        code: parent,
                        description: placeholder_description(ItemKind::Assembly, parent),
                        unit: Some(PLACEHOLDER_UNIT.to_string()),
                        classification: None,
                    });
            }
        }

        let (Some(child), Some(kind)) = (edge.child_code.filter(|c| *c > 0), edge.child_kind) else {
            continue;
        };
        if is_known(kind, child) {
            continue;
        }
        let description = edge
            .child_description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| placeholder_description(kind, child));
        let unit = edge
            .child_unit
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(PLACEHOLDER_UNIT)
            .to_string();
        planned.entry((kind, child)).or_insert(CatalogEntry {
            code: child,
            description,
            unit: Some(unit),
            classification: None,
        });
    }

    planned
        .into_iter()
        .map(|((kind, _), entry)| (kind, entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(parent: i64, child: i64, kind: ItemKind, desc: Option<&str>) -> StructureEdgeRecord {
        StructureEdgeRecord {
            row_number: 1,
            parent_code: Some(parent),
            child_code: Some(child),
            child_kind: Some(kind),
            coefficient: Some(1.0),
            child_description: desc.map(|s| s.to_string()),
            child_unit: None,
        }
    }

    #[test]
    fn test_plan_only_unknown_codes() {
        let edges = vec![
            edge(100, 10, ItemKind::Elementary, Some("CIMENTO CP II")),
            edge(100, 11, ItemKind::Elementary, None),
            edge(200, 100, ItemKind::Assembly, None),
            edge(200, 10, ItemKind::Elementary, None),
        ];
        let planned = plan_placeholders(&edges, |kind| match kind {
            ItemKind::Elementary => [11].into_iter().collect(),
            ItemKind::Assembly => [100].into_iter().collect(),
        });

        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].0, ItemKind::Elementary);
        assert_eq!(planned[0].1.code, 10);
        assert_eq!(planned[0].1.description, "CIMENTO CP II");
        assert_eq!(planned[1].0, ItemKind::Assembly);
        assert_eq!(planned[1].1.description, "PLACEHOLDER ASSEMBLY 200");
        assert_eq!(planned[1].1.unit.as_deref(), Some(PLACEHOLDER_UNIT));
    }

    #[test]
    fn test_incomplete_edges_are_ignored() {
        let mut broken = edge(0, 10, ItemKind::Elementary, None);
        broken.child_kind = None;
        let planned = plan_placeholders(&[broken], |_| HashSet::new());
        assert!(planned.is_empty());
    }
}
