// ==========================================
// SINAPI 目录同步 - 提取源
// ==========================================
// 职责: 读取单一参考期的表格文件，产出 PeriodExtract
// 目录约定:
// - <dir>/<YYYY-MM>/ 存在时优先使用，否则直接读取 <dir>
// - history / elementary / assemblies / structure / prices / costs
//   每个逻辑输入一个文件，扩展名 .csv / .xlsx / .xls
// 缺失:
// - history 缺失 → 空历史批次
// - elementary 与 assemblies 均缺失 → reference = None（本期无数据）
// ==========================================

use crate::domain::{PeriodExtract, ReferenceExtract};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{FileParser, RawRow, UniversalFileParser};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// 逻辑输入文件名（不含扩展名）
pub mod source_files {
    pub const HISTORY: &str = "history";
    pub const ELEMENTARY: &str = "elementary";
    pub const ASSEMBLIES: &str = "assemblies";
    pub const STRUCTURE: &str = "structure";
    pub const PRICES: &str = "prices";
    pub const COSTS: &str = "costs";
}

/// 单一参考期输入的提供方
pub trait ExtractSource {
    fn load_period(&self, period: NaiveDate) -> ImportResult<PeriodExtract>;
}

// ==========================================
// DirectoryExtractSource - 目录提取源
// ==========================================
pub struct DirectoryExtractSource {
    root: PathBuf,
    parser: UniversalFileParser,
    mapper: FieldMapper,
}

impl DirectoryExtractSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            parser: UniversalFileParser,
            mapper: FieldMapper,
        }
    }

    /// 参考期目录：存在 YYYY-MM 子目录时使用之
    pub fn period_dir(&self, period: NaiveDate) -> PathBuf {
        let candidate = self.root.join(period.format("%Y-%m").to_string());
        if candidate.is_dir() {
            candidate
        } else {
            self.root.clone()
        }
    }

    /// 按扩展名优先级查找逻辑输入文件
    fn locate(dir: &Path, stem: &str) -> Option<PathBuf> {
        SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", stem, ext)))
            .find(|p| p.is_file())
    }

    fn read(&self, dir: &Path, stem: &str) -> ImportResult<Option<Vec<RawRow>>> {
        match Self::locate(dir, stem) {
            Some(path) => {
                let rows = self.parser.parse_rows(&path)?;
                debug!(file = %path.display(), rows = rows.len(), "已读取输入文件");
                Ok(Some(rows))
            }
            None => Ok(None),
        }
    }

    fn read_mapped<T, F>(&self, dir: &Path, stem: &str, map: F) -> ImportResult<Option<Vec<T>>>
    where
        F: Fn(&FieldMapper, &RawRow) -> T,
    {
        Ok(self
            .read(dir, stem)?
            .map(|rows| rows.iter().map(|r| map(&self.mapper, r)).collect()))
    }
}

impl ExtractSource for DirectoryExtractSource {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn load_period(&self, period: NaiveDate) -> ImportResult<PeriodExtract> {
        if !self.root.is_dir() {
            return Err(ImportError::ExtractDirNotFound(self.root.display().to_string()));
        }
        let dir = self.period_dir(period);

        let history = self
            .read_mapped(&dir, source_files::HISTORY, FieldMapper::map_history)?
            .unwrap_or_default();

        let elementary = self.read_mapped(&dir, source_files::ELEMENTARY, FieldMapper::map_catalog)?;
        let assemblies = self.read_mapped(&dir, source_files::ASSEMBLIES, FieldMapper::map_catalog)?;

        let reference = if elementary.is_none() && assemblies.is_none() {
            warn!(dir = %dir.display(), "未找到目录文件，本期按无参考数据处理");
            None
        } else {
            Some(ReferenceExtract {
                elementary: elementary.unwrap_or_default(),
                assemblies: assemblies.unwrap_or_default(),
                edges: self
                    .read_mapped(&dir, source_files::STRUCTURE, FieldMapper::map_edge)?
                    .unwrap_or_default(),
                prices: self
                    .read_mapped(&dir, source_files::PRICES, FieldMapper::map_fact)?
                    .unwrap_or_default(),
                costs: self
                    .read_mapped(&dir, source_files::COSTS, FieldMapper::map_fact)?
                    .unwrap_or_default(),
            })
        };

        info!(
            history = history.len(),
            has_reference = reference.is_some(),
            "参考期输入已加载"
        );
        Ok(PeriodExtract { history, reference })
    }
}
