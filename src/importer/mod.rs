// ==========================================
// SINAPI 目录同步 - 提取适配层
// ==========================================
// 职责: 表格文件 → 类型化输入记录（PeriodExtract）
// 流程: 文件解析 → 字段映射 → 按参考期组装
// 红线: 不做表头探测；单元格缺陷交由同步阶段按行拒绝
// ==========================================

pub mod error;
pub mod extract;
pub mod field_mapper;
pub mod file_parser;

pub use error::{ImportError, ImportResult};
pub use extract::{source_files, DirectoryExtractSource, ExtractSource};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRow, UniversalFileParser};
