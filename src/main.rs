// ==========================================
// SINAPI 目录同步 - 命令行入口
// ==========================================
// 用法:
//   sinapi-sync [config.json]
// 未给出配置文件时从 SINAPI_* 环境变量加载
// 输出: 运行汇总 JSON（stdout）；FAILURE 时退出码非零
// ==========================================

use anyhow::{anyhow, Context};
use sinapi_sync::config::{ConfigManager, PipelineConfig};
use sinapi_sync::db::{init_schema, open_sqlite_connection};
use sinapi_sync::domain::RunSummary;
use sinapi_sync::engine::RunCoordinator;
use sinapi_sync::importer::{DirectoryExtractSource, ExtractSource};
use sinapi_sync::logging;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    logging::init_from_env();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", sinapi_sync::APP_NAME, sinapi_sync::VERSION);
    tracing::info!("==================================================");

    match run() {
        Ok(summary) => {
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::error!(error = %e, "运行汇总序列化失败"),
            }
            if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "同步未能启动");
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<RunSummary> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_json_file(&path)
            .with_context(|| format!("加载配置文件失败: {}", path))?,
        None => PipelineConfig::from_env().context("从环境变量加载配置失败")?,
    };

    let db_path = config.resolved_db_path();
    if let Some(parent) = Path::new(&db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("无法创建数据库目录: {}", parent.display()))?;
    }
    tracing::info!("使用数据库: {}", db_path);

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    ConfigManager::new(&conn).apply_overrides(&mut config)?;

    let extract_dir = config
        .extract_dir
        .clone()
        .ok_or_else(|| anyhow!("未配置提取目录 (extract_dir / SINAPI_EXTRACT_DIR)"))?;
    let period = config.reference_date()?;
    let extract = DirectoryExtractSource::new(&extract_dir)
        .load_period(period)
        .with_context(|| format!("读取提取目录失败: {}", extract_dir))?;

    let mut coordinator = RunCoordinator::new(conn, config)?;
    Ok(coordinator.run(&extract))
}
