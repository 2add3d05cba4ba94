// ==========================================
// SINAPI 目录同步 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls，取首个工作表) / CSV (.csv，逗号或分号分隔)
// 约定: 首行为固定表头，列名去空白转小写；完全空白的行跳过
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 原始行（列名 → 单元格文本），保留源文件行号
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub row_number: usize,
    pub fields: HashMap<String, String>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// 文件解析器接口
pub trait FileParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<RawRow>>;
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_start_matches('\u{feff}').to_lowercase()
}

fn build_row(row_number: usize, headers: &[String], values: impl Iterator<Item = String>) -> Option<RawRow> {
    let fields: HashMap<String, String> = headers
        .iter()
        .zip(values)
        .filter(|(h, _)| !h.is_empty())
        .map(|(h, v)| (h.clone(), v.trim().to_string()))
        .collect();

    // 跳过完全空白的行
    if fields.values().all(|v| v.is_empty()) {
        return None;
    }
    Some(RawRow { row_number, fields })
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 依据表头行判断分隔符（分号多于逗号时取分号）
    fn sniff_delimiter(content: &str) -> u8 {
        let header = content.lines().next().unwrap_or("");
        if header.matches(';').count() > header.matches(',').count() {
            b';'
        } else {
            b','
        }
    }
}

impl FileParser for CsvParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<RawRow>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }
        if let Some(ext) = file_path.extension() {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(ImportError::UnsupportedFormat(ext.to_string_lossy().to_string()));
            }
        }

        let content = fs::read_to_string(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .delimiter(Self::sniff_delimiter(&content))
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            // 表头占第 1 行
            if let Some(row) = build_row(idx + 2, &headers, record.iter().map(str::to_string)) {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<RawRow>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let mut sheet_rows = range.rows();
        let headers: Vec<String> = match sheet_rows.next() {
            Some(header_row) => header_row.iter().map(|c| normalize_header(&c.to_string())).collect(),
            None => return Ok(Vec::new()),
        };

        let rows = sheet_rows
            .enumerate()
            .filter_map(|(idx, cells)| build_row(idx + 2, &headers, cells.iter().map(|c| c.to_string())))
            .collect();
        Ok(rows)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_rows(&self, file_path: &Path) -> ImportResult<Vec<RawRow>> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_rows(file_path),
            "xlsx" | "xls" => ExcelParser.parse_rows(file_path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_csv_parser_normalizes_headers() {
        let file = csv_file(&["Code , Description,UNIT", "7001,TUBO PVC,M", "7002,LUVA,UN"]);

        let rows = CsvParser.parse_rows(file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].get("code"), Some("7001"));
        assert_eq!(rows[1].get("unit"), Some("UN"));
    }

    #[test]
    fn test_csv_parser_semicolon_delimiter() {
        let file = csv_file(&["item_code;region_code;value", "7001;SP;12,50"]);

        let rows = CsvParser.parse_rows(file.path()).unwrap();

        assert_eq!(rows[0].get("value"), Some("12,50"));
        assert_eq!(rows[0].get("region_code"), Some("SP"));
    }

    #[test]
    fn test_csv_parser_skips_blank_rows_and_keeps_line_numbers() {
        let file = csv_file(&["code,description", "1,A", ",", "2,B"]);

        let rows = CsvParser.parse_rows(file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].row_number, 4);
    }

    #[test]
    fn test_parser_errors() {
        assert!(matches!(
            CsvParser.parse_rows(Path::new("non_existent.csv")),
            Err(ImportError::FileNotFound(_))
        ));
        assert!(matches!(
            UniversalFileParser.parse_rows(Path::new("data.json")),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }
}
