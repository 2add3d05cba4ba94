// ==========================================
// SINAPI 目录同步 - 字段映射器实现
// ==========================================
// 职责: 原始行 → 类型化输入记录
// 规则:
// - 列名支持英文标准名与葡语别名（小写比较）
// - 单元格无法解析时映射为 None，由同步阶段按行拒绝
// - 数值接受小数逗号（12,50 / 1.234,56）
// - 日期接受 YYYY-MM-DD / YYYY-MM / MM/YYYY / DD/MM/YYYY / Excel 序列号
// ==========================================

use crate::domain::{
    CatalogRow, HistoryEventRecord, ItemKind, RegionalFactRecord, Regime, StructureEdgeRecord,
};
use crate::importer::file_parser::RawRow;
use chrono::{Duration, NaiveDate};
use std::str::FromStr;

/// 列名别名表
mod columns {
    pub const ITEM_CODE: &[&str] = &["item_code", "codigo", "codigo_item", "code"];
    pub const CODE: &[&str] = &["code", "codigo"];
    pub const ITEM_KIND: &[&str] = &["item_kind", "tipo_item", "tipo"];
    pub const REFERENCE_DATE: &[&str] = &["reference_date", "data_referencia", "referencia"];
    pub const MAINTENANCE_TYPE: &[&str] = &["maintenance_type", "tipo_manutencao", "manutencao"];
    pub const DESCRIPTION: &[&str] = &["description", "descricao"];
    pub const UNIT: &[&str] = &["unit", "unidade"];
    pub const CLASSIFICATION: &[&str] = &["classification", "classificacao", "grupo"];
    pub const PARENT_CODE: &[&str] = &["parent_code", "codigo_composicao", "codigo_da_composicao"];
    pub const CHILD_CODE: &[&str] = &["child_code", "codigo_item", "codigo_do_item"];
    pub const CHILD_KIND: &[&str] = &["child_kind", "tipo_item"];
    pub const COEFFICIENT: &[&str] = &["coefficient", "coeficiente"];
    pub const CHILD_DESCRIPTION: &[&str] = &["child_description", "descricao_item"];
    pub const CHILD_UNIT: &[&str] = &["child_unit", "unidade_item"];
    pub const REGION_CODE: &[&str] = &["region_code", "uf", "estado"];
    pub const REGIME: &[&str] = &["regime"];
    pub const VALUE: &[&str] = &["value", "valor", "preco", "custo"];
}

pub struct FieldMapper;

impl FieldMapper {
    pub fn map_history(&self, row: &RawRow) -> HistoryEventRecord {
        HistoryEventRecord {
            row_number: row.row_number,
            item_code: parse_code(text(row, columns::ITEM_CODE)),
            item_kind: parse_enum::<ItemKind>(text(row, columns::ITEM_KIND)),
            reference_date: parse_date(text(row, columns::REFERENCE_DATE)),
            maintenance_type: text(row, columns::MAINTENANCE_TYPE).map(str::to_string),
            description: text(row, columns::DESCRIPTION).map(str::to_string),
        }
    }

    pub fn map_catalog(&self, row: &RawRow) -> CatalogRow {
        CatalogRow {
            row_number: row.row_number,
            code: parse_code(text(row, columns::CODE)),
            description: text(row, columns::DESCRIPTION).map(str::to_string),
            unit: text(row, columns::UNIT).map(str::to_string),
            classification: text(row, columns::CLASSIFICATION).map(str::to_string),
        }
    }

    pub fn map_edge(&self, row: &RawRow) -> StructureEdgeRecord {
        StructureEdgeRecord {
            row_number: row.row_number,
            parent_code: parse_code(text(row, columns::PARENT_CODE)),
            child_code: parse_code(text(row, columns::CHILD_CODE)),
            child_kind: parse_enum::<ItemKind>(text(row, columns::CHILD_KIND)),
            coefficient: parse_decimal(text(row, columns::COEFFICIENT)),
            child_description: text(row, columns::CHILD_DESCRIPTION).map(str::to_string),
            child_unit: text(row, columns::CHILD_UNIT).map(str::to_string),
        }
    }

    pub fn map_fact(&self, row: &RawRow) -> RegionalFactRecord {
        RegionalFactRecord {
            row_number: row.row_number,
            item_code: parse_code(text(row, columns::ITEM_CODE)),
            region_code: text(row, columns::REGION_CODE).map(str::to_string),
            reference_date: parse_date(text(row, columns::REFERENCE_DATE)),
            regime: parse_enum::<Regime>(text(row, columns::REGIME)),
            value: parse_decimal(text(row, columns::VALUE)),
        }
    }
}

/// 按别名顺序取第一个非空单元格
fn text<'r>(row: &'r RawRow, aliases: &[&str]) -> Option<&'r str> {
    aliases
        .iter()
        .filter_map(|alias| row.get(alias))
        .map(str::trim)
        .find(|v| !v.is_empty())
}

fn parse_enum<T: FromStr>(raw: Option<&str>) -> Option<T> {
    raw.and_then(|v| v.parse::<T>().ok())
}

/// 编码：整数，兼容 Excel 导出的 "7001.0"
pub fn parse_code(raw: Option<&str>) -> Option<i64> {
    let v = raw?.trim();
    if let Ok(code) = v.parse::<i64>() {
        return Some(code);
    }
    let f = v.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

/// 数值：接受小数逗号与千分位点
pub fn parse_decimal(raw: Option<&str>) -> Option<f64> {
    let v = raw?.trim().replace(' ', "");
    let normalized = if v.contains(',') {
        v.replace('.', "").replace(',', ".")
    } else {
        v
    };
    normalized.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// 日期：月度格式取当月首日
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let v = raw?.trim();

    if let Ok(d) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(v, "%d/%m/%Y") {
        return Some(d);
    }
    // 日期时间文本，只取日期部分
    if let Some(date_part) = v.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Some(d);
        }
    }

    let (year, month) = if let Some((y, m)) = v.split_once('-') {
        (y, m)
    } else if let Some((m, y)) = v.split_once('/') {
        (y, m)
    } else {
        // Excel 序列号（1899-12-30 起算）
        let serial = v.parse::<f64>().ok().filter(|s| (1.0..200_000.0).contains(s))?;
        let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
        return base.checked_add_signed(Duration::days(serial.trunc() as i64));
    };
    NaiveDate::from_ymd_opt(year.trim().parse().ok()?, month.trim().parse().ok()?, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn raw(pairs: &[(&str, &str)]) -> RawRow {
        RawRow {
            row_number: 3,
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_parse_decimal_variants() {
        assert_eq!(parse_decimal(Some("12,50")), Some(12.5));
        assert_eq!(parse_decimal(Some("1.234,56")), Some(1234.56));
        assert_eq!(parse_decimal(Some("0.25")), Some(0.25));
        assert_eq!(parse_decimal(Some("n/a")), None);
        assert_eq!(parse_decimal(None), None);
    }

    #[test]
    fn test_parse_date_variants() {
        let jul = NaiveDate::from_ymd_opt(2025, 7, 1);
        assert_eq!(parse_date(Some("2025-07-01")), jul);
        assert_eq!(parse_date(Some("2025-07")), jul);
        assert_eq!(parse_date(Some("07/2025")), jul);
        assert_eq!(parse_date(Some("01/07/2025")), jul);
        assert_eq!(parse_date(Some("2025-07-01 00:00:00")), jul);
        assert_eq!(parse_date(Some("45839")), jul);
        assert_eq!(parse_date(Some("13/2025")), None);
        assert_eq!(parse_date(Some("julho")), None);
    }

    #[test]
    fn test_parse_code_accepts_excel_floats() {
        assert_eq!(parse_code(Some("7001")), Some(7001));
        assert_eq!(parse_code(Some("7001.0")), Some(7001));
        assert_eq!(parse_code(Some("7001.5")), None);
        assert_eq!(parse_code(Some("ABC")), None);
    }

    #[test]
    fn test_map_history_with_portuguese_aliases() {
        let row = raw(&[
            ("codigo", "7001"),
            ("tipo_item", "INSUMO"),
            ("data_referencia", "07/2025"),
            ("tipo_manutencao", "DESATIVAÇÃO"),
            ("descricao", ""),
        ]);

        let record = FieldMapper.map_history(&row);

        assert_eq!(record.row_number, 3);
        assert_eq!(record.item_code, Some(7001));
        assert_eq!(record.item_kind, Some(ItemKind::Elementary));
        assert_eq!(record.reference_date, NaiveDate::from_ymd_opt(2025, 7, 1));
        assert_eq!(record.description, None);
    }

    #[test]
    fn test_unparseable_cells_become_none() {
        let row = raw(&[
            ("item_code", "x"),
            ("region_code", "SP"),
            ("regime", "???"),
            ("value", "abc"),
        ]);

        let record = FieldMapper.map_fact(&row);

        assert_eq!(record.item_code, None);
        assert_eq!(record.regime, None);
        assert_eq!(record.value, None);
        assert_eq!(record.region_code.as_deref(), Some("SP"));
    }
}
