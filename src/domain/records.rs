// ==========================================
// SINAPI 目录同步 - 输入记录
// ==========================================
// 职责: 外部提取适配器产出的类型化记录（键字段可缺失）
// 说明: 缺失/非法的键字段保留为 None，由各阶段按行拒绝并上报
// ==========================================

use crate::domain::types::{ItemKind, Regime};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// HistoryEventRecord - 维护历史事件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEventRecord {
    pub row_number: usize,                  // 源文件行号
    pub item_code: Option<i64>,             // 条目编码
    pub item_kind: Option<ItemKind>,        // 条目类别
    pub reference_date: Option<NaiveDate>,  // 参考期
    pub maintenance_type: Option<String>,   // 维护类型（自由文本）
    pub description: Option<String>,        // 事件说明
}

// ==========================================
// CatalogRow - 目录行（基础/组合共用）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub row_number: usize,
    pub code: Option<i64>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub classification: Option<String>, // 基础条目: 分类；组合条目: 分组
}

// ==========================================
// StructureEdgeRecord - 组合结构边
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureEdgeRecord {
    pub row_number: usize,
    pub parent_code: Option<i64>,
    pub child_code: Option<i64>,
    pub child_kind: Option<ItemKind>,
    pub coefficient: Option<f64>,
    // 子项明细（仅用于生成占位目录行）
    pub child_description: Option<String>,
    pub child_unit: Option<String>,
}

// ==========================================
// RegionalFactRecord - 区域价格/成本行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalFactRecord {
    pub row_number: usize,
    pub item_code: Option<i64>,
    pub region_code: Option<String>,
    pub reference_date: Option<NaiveDate>, // 缺失时取本期参考日期
    pub regime: Option<Regime>,
    pub value: Option<f64>,
}

// ==========================================
// ReferenceExtract - 参考期主数据提取
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceExtract {
    pub elementary: Vec<CatalogRow>,
    pub assemblies: Vec<CatalogRow>,
    pub edges: Vec<StructureEdgeRecord>,
    pub prices: Vec<RegionalFactRecord>,
    pub costs: Vec<RegionalFactRecord>,
}

// ==========================================
// PeriodExtract - 单一参考期的全部输入
// ==========================================
// reference = None 表示本期无参考数据（仅处理维护历史）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodExtract {
    pub history: Vec<HistoryEventRecord>,
    pub reference: Option<ReferenceExtract>,
}

impl PeriodExtract {
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.reference.is_none()
    }
}
