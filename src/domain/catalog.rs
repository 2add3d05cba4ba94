// ==========================================
// SINAPI 目录同步 - 持久化实体
// ==========================================
// 职责: 校验后写入/读出存储的实体
// ==========================================

use crate::domain::types::{FactKind, ItemKind, ItemStatus, Regime};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// HistoryEvent - 不可变维护历史
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub seq: i64, // 写入顺序（同日裁决依据）
    pub item_code: i64,
    pub item_kind: ItemKind,
    pub reference_date: NaiveDate,
    pub maintenance_type: String,
    pub description: Option<String>,
}

// ==========================================
// CatalogItem - 目录条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub kind: ItemKind,
    pub code: i64,
    pub description: String,
    pub unit: Option<String>,
    pub classification: Option<String>,
    pub status: ItemStatus,
}

/// 写入目录表的字段集合（不含 status）
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub code: i64,
    pub description: String,
    pub unit: Option<String>,
    pub classification: Option<String>,
}

// ==========================================
// StructureEdge - 当前结构边
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureEdge {
    pub parent_code: i64,
    pub child_code: i64,
    pub child_kind: ItemKind,
    pub coefficient: f64,
}

impl StructureEdge {
    pub fn key(&self) -> (i64, i64, ItemKind) {
        (self.parent_code, self.child_code, self.child_kind)
    }
}

// ==========================================
// ExplodedComponent - 组合展开结果行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplodedComponent {
    pub parent_code: i64,
    pub item_code: i64,
    pub item_kind: ItemKind,
    pub depth: u32,
    pub coefficient: f64,             // 直接系数
    pub accumulated_coefficient: f64, // 自根组合起的系数连乘
}

// ==========================================
// FactKey / RegionalFact - 区域月度事实
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactKey {
    pub item_code: i64,
    pub region_code: String,
    pub reference_date: NaiveDate,
    pub regime: Regime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalFact {
    pub kind: FactKind,
    pub key: FactKey,
    pub value: f64,
}

/// 待写入的维护历史（seq 由存储分配）
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEvent {
    pub item_code: i64,
    pub item_kind: ItemKind,
    pub reference_date: NaiveDate,
    pub maintenance_type: String,
    pub description: Option<String>,
}
