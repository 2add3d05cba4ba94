// ==========================================
// SINAPI 目录同步 - 领域类型定义
// ==========================================
// 职责: 条目类别 / 生命周期状态 / 税制 / 重复策略 / 运行状态机
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 枚举解析失败
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("无法识别的{kind}取值: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ==========================================
// 条目类别 (Item Kind)
// ==========================================
// 基础条目(insumo) / 组合条目(composição)，编码仅在类别内唯一
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Elementary,
    Assembly,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Elementary => "ELEMENTARY",
            ItemKind::Assembly => "ASSEMBLY",
        }
    }

    /// 对应的目录表
    pub fn catalog_table(&self) -> &'static str {
        match self {
            ItemKind::Elementary => "elementary_item",
            ItemKind::Assembly => "assembly_item",
        }
    }

    /// 以该类别为子项的结构边表
    pub fn edge_table(&self) -> &'static str {
        match self {
            ItemKind::Elementary => "assembly_elementary_edge",
            ItemKind::Assembly => "assembly_subassembly_edge",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = ParseEnumError;

    // 源文件使用葡语术语 INSUMO / COMPOSICAO
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ELEMENTARY" | "INSUMO" => Ok(ItemKind::Elementary),
            "ASSEMBLY" | "COMPOSICAO" | "COMPOSIÇÃO" => Ok(ItemKind::Assembly),
            _ => Err(ParseEnumError::new("条目类别", s)),
        }
    }
}

// ==========================================
// 生命周期状态 (Item Status)
// ==========================================
// 红线: 仅由状态同步器根据维护历史写入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    #[default]
    Active,
    Deactivated,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "ACTIVE",
            ItemStatus::Deactivated => "DEACTIVATED",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" | "ATIVO" => Ok(ItemStatus::Active),
            "DEACTIVATED" | "DESATIVADO" => Ok(ItemStatus::Deactivated),
            _ => Err(ParseEnumError::new("状态", s)),
        }
    }
}

// ==========================================
// 税制 (Regime)
// ==========================================
// 价格/成本报价所依据的税费口径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    NaoDesonerado, // 未减免
    Desonerado,    // 已减免
    SemEncargos,   // 不含社保负担
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::NaoDesonerado => "NAO_DESONERADO",
            Regime::Desonerado => "DESONERADO",
            Regime::SemEncargos => "SEM_ENCARGOS",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "NAO_DESONERADO" | "NÃO_DESONERADO" | "SD" => Ok(Regime::NaoDesonerado),
            "DESONERADO" | "CD" => Ok(Regime::Desonerado),
            "SEM_ENCARGOS" | "SE" => Ok(Regime::SemEncargos),
            _ => Err(ParseEnumError::new("税制", s)),
        }
    }
}

// ==========================================
// 事实类别 (Fact Kind)
// ==========================================
// 价格 → 基础条目；成本 → 组合条目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactKind {
    Price,
    Cost,
}

impl FactKind {
    pub fn item_kind(&self) -> ItemKind {
        match self {
            FactKind::Price => ItemKind::Elementary,
            FactKind::Cost => ItemKind::Assembly,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            FactKind::Price => "elementary_price_monthly",
            FactKind::Cost => "assembly_cost_monthly",
        }
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactKind::Price => write!(f, "PRICE"),
            FactKind::Cost => write!(f, "COST"),
        }
    }
}

// ==========================================
// 重复策略 (Duplicate Policy)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// 先删除同键旧行，再写入新行
    #[default]
    Replace,
    /// 仅写入库中不存在的键
    Aggregate,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::Replace => write!(f, "replace"),
            DuplicatePolicy::Aggregate => write!(f, "aggregate"),
        }
    }
}

impl FromStr for DuplicatePolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" | "substituir" => Ok(DuplicatePolicy::Replace),
            "aggregate" | "agregar" => Ok(DuplicatePolicy::Aggregate),
            _ => Err(ParseEnumError::new("重复策略", s)),
        }
    }
}

// ==========================================
// 同日事件裁决 (Tie Break)
// ==========================================
// 同一条目最新参考日期上存在多条事件时的取舍规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TieBreak {
    #[default]
    LastIngested,
    FirstIngested,
    PreferDeactivation,
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TieBreak::LastIngested => write!(f, "LAST_INGESTED"),
            TieBreak::FirstIngested => write!(f, "FIRST_INGESTED"),
            TieBreak::PreferDeactivation => write!(f, "PREFER_DEACTIVATION"),
        }
    }
}

impl FromStr for TieBreak {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LAST_INGESTED" => Ok(TieBreak::LastIngested),
            "FIRST_INGESTED" => Ok(TieBreak::FirstIngested),
            "PREFER_DEACTIVATION" => Ok(TieBreak::PreferDeactivation),
            _ => Err(ParseEnumError::new("同日裁决规则", s)),
        }
    }
}

// ==========================================
// 同步阶段 (Sync Phase)
// ==========================================
// 固定顺序: History → Status → Catalog → Structure → Facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncPhase {
    History,
    Status,
    Catalog,
    Structure,
    Facts,
}

impl SyncPhase {
    pub const ORDERED: [SyncPhase; 5] = [
        SyncPhase::History,
        SyncPhase::Status,
        SyncPhase::Catalog,
        SyncPhase::Structure,
        SyncPhase::Facts,
    ];

    /// 阶段成功后进入的运行状态
    pub fn completed_state(&self) -> RunState {
        match self {
            SyncPhase::History => RunState::HistoryLoaded,
            SyncPhase::Status => RunState::StatusSynced,
            SyncPhase::Catalog => RunState::CatalogUpserted,
            SyncPhase::Structure => RunState::StructureReloaded,
            SyncPhase::Facts => RunState::FactsLoaded,
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::History => write!(f, "HISTORY"),
            SyncPhase::Status => write!(f, "STATUS"),
            SyncPhase::Catalog => write!(f, "CATALOG"),
            SyncPhase::Structure => write!(f, "STRUCTURE"),
            SyncPhase::Facts => write!(f, "FACTS"),
        }
    }
}

// ==========================================
// 运行状态 (Run State)
// ==========================================
// PENDING → HISTORY_LOADED → STATUS_SYNCED → CATALOG_UPSERTED
//   → STRUCTURE_RELOADED → FACTS_LOADED → DONE；任一非终态可转入 FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Pending,
    HistoryLoaded,
    StatusSynced,
    CatalogUpserted,
    StructureReloaded,
    FactsLoaded,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }

    /// 当前状态之后应执行的阶段
    pub fn next_phase(&self) -> Option<SyncPhase> {
        match self {
            RunState::Pending => Some(SyncPhase::History),
            RunState::HistoryLoaded => Some(SyncPhase::Status),
            RunState::StatusSynced => Some(SyncPhase::Catalog),
            RunState::CatalogUpserted => Some(SyncPhase::Structure),
            RunState::StructureReloaded => Some(SyncPhase::Facts),
            RunState::FactsLoaded | RunState::Done | RunState::Failed => None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Pending => "PENDING",
            RunState::HistoryLoaded => "HISTORY_LOADED",
            RunState::StatusSynced => "STATUS_SYNCED",
            RunState::CatalogUpserted => "CATALOG_UPSERTED",
            RunState::StructureReloaded => "STRUCTURE_RELOADED",
            RunState::FactsLoaded => "FACTS_LOADED",
            RunState::Done => "DONE",
            RunState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

// ==========================================
// 运行结果状态 (Run Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    SuccessNoData,
    Failure,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "SUCCESS"),
            RunStatus::SuccessNoData => write!(f, "SUCCESS_NO_DATA"),
            RunStatus::Failure => write!(f, "FAILURE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_accepts_source_terms() {
        assert_eq!("insumo".parse::<ItemKind>().unwrap(), ItemKind::Elementary);
        assert_eq!(" COMPOSICAO ".parse::<ItemKind>().unwrap(), ItemKind::Assembly);
        assert_eq!("ELEMENTARY".parse::<ItemKind>().unwrap(), ItemKind::Elementary);
        assert!("SERVICO".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_duplicate_policy_aliases() {
        assert_eq!("Substituir".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Replace);
        assert_eq!("agregar".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Aggregate);
        assert_eq!("AGGREGATE".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Aggregate);
        assert!("append".parse::<DuplicatePolicy>().is_err());
    }

    #[test]
    fn test_regime_normalization() {
        assert_eq!("não desonerado".parse::<Regime>().unwrap(), Regime::NaoDesonerado);
        assert_eq!("sem-encargos".parse::<Regime>().unwrap(), Regime::SemEncargos);
        assert_eq!(Regime::Desonerado.to_string(), "DESONERADO");
    }

    #[test]
    fn test_run_state_walks_phases_in_order() {
        let mut state = RunState::Pending;
        let mut visited = Vec::new();
        while let Some(phase) = state.next_phase() {
            visited.push(phase);
            state = phase.completed_state();
        }
        assert_eq!(visited, SyncPhase::ORDERED.to_vec());
        assert_eq!(state, RunState::FactsLoaded);
        assert!(!state.is_terminal());
        assert!(RunState::Failed.is_terminal());
    }
}
