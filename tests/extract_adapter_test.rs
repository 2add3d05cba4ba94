// ==========================================
// 提取适配器集成测试
// ==========================================
// 测试目标: CSV 目录 → PeriodExtract → 完整同步 → 读侧查询
// ==========================================


use sinapi_sync::config::PipelineConfig;
use sinapi_sync::domain::{FactKind, ItemKind, ItemStatus, Regime, RejectionKind, RunStatus};
use sinapi_sync::importer::{DirectoryExtractSource, ExtractSource};
use sinapi_sync::logging;
use sinapi_sync::repository::{
    CatalogRepository, FactRepository, StructureRepository, DEFAULT_MAX_EXPLOSION_DEPTH,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use test_helpers::{july_2025, ymd};

fn write_period(dir: &Path) {
    fs::write(
        dir.join("history.csv"),
        "codigo,tipo_item,data_referencia,tipo_manutencao,descricao\n\
         11,INSUMO,07/2025,DESATIVAÇÃO,AREIA FORA DE LINHA\n\
         ,INSUMO,07/2025,INCLUSAO,SEM CODIGO\n",
    )
    .unwrap();
    fs::write(
        dir.join("elementary.csv"),
        "code;description;unit;classification\n\
         10;CIMENTO CP II;KG;MATERIAL\n\
         11;AREIA MEDIA;M3;MATERIAL\n",
    )
    .unwrap();
    fs::write(
        dir.join("assemblies.csv"),
        "code,description,unit,classification\n100,ARGAMASSA 1:3,M3,ALVENARIA\n",
    )
    .unwrap();
    fs::write(
        dir.join("structure.csv"),
        "parent_code;child_code;child_kind;coefficient\n\
         100;10;INSUMO;350,5\n\
         100;11;INSUMO;1,2\n\
         100;55;INSUMO;0,1\n",
    )
    .unwrap();
    fs::write(
        dir.join("prices.csv"),
        "item_code;uf;regime;valor\n\
         10;SP;NAO_DESONERADO;0,89\n\
         11;SP;NAO_DESONERADO;\n",
    )
    .unwrap();
    fs::write(
        dir.join("costs.csv"),
        "item_code,region_code,reference_date,regime,value\n100,SP,2025-07-01,DESONERADO,512.40\n",
    )
    .unwrap();
}

#[test]
fn test_directory_extract_runs_end_to_end() {
    logging::init_test();
    let extract_dir = TempDir::new().unwrap();
    write_period(extract_dir.path());
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();

    let extract = DirectoryExtractSource::new(extract_dir.path())
        .load_period(july_2025())
        .unwrap();
    assert_eq!(extract.history.len(), 2);
    let reference = extract.reference.as_ref().unwrap();
    assert_eq!(reference.edges[0].coefficient, Some(350.5));
    assert_eq!(reference.prices[0].reference_date, None);

    let summary = test_helpers::coordinator(&db_path, PipelineConfig::for_period(2025, 7)).run(&extract);
    assert_eq!(summary.status, RunStatus::Success);

    // 历史缺编码行、未知子项 55、缺值价格行
    let rejected: Vec<_> = summary
        .rejections
        .iter()
        .map(|r| (r.table.as_str(), r.kind))
        .collect();
    assert_eq!(
        rejected,
        vec![
            ("maintenance_history", RejectionKind::MalformedRecord),
            ("assembly_elementary_edge", RejectionKind::ReferentialIntegrity),
            ("elementary_price_monthly", RejectionKind::MalformedRecord),
        ]
    );

    let conn = test_helpers::open(&db_path);
    let exploded = StructureRepository::new(&conn)
        .explode_assembly(100, DEFAULT_MAX_EXPLOSION_DEPTH)
        .unwrap();
    assert_eq!(exploded.len(), 2);

    let facts = FactRepository::new(&conn);
    assert_eq!(
        facts
            .value_at(FactKind::Price, 10, "SP", Regime::NaoDesonerado, ymd(2025, 7, 15))
            .unwrap(),
        Some((july_2025(), 0.89))
    );
    assert_eq!(
        facts
            .value_at(FactKind::Cost, 100, "SP", Regime::Desonerado, ymd(2025, 12, 1))
            .unwrap(),
        Some((july_2025(), 512.4))
    );

    // 11 号在本次运行中新建，下次同步后才反映停用
    let catalog = CatalogRepository::new(&conn);
    assert_eq!(
        catalog.find(ItemKind::Elementary, 11).unwrap().unwrap().status,
        ItemStatus::Active
    );
    drop(conn);

    test_helpers::coordinator(&db_path, PipelineConfig::for_period(2025, 7)).run(&extract);
    let conn = test_helpers::open(&db_path);
    assert_eq!(
        CatalogRepository::new(&conn)
            .find(ItemKind::Elementary, 11)
            .unwrap()
            .unwrap()
            .status,
        ItemStatus::Deactivated
    );
}

#[test]
fn test_directory_without_catalog_files_is_no_data() {
    let extract_dir = TempDir::new().unwrap();
    fs::write(
        extract_dir.path().join("history.csv"),
        "item_code,item_kind,reference_date,maintenance_type\n10,COMPOSICAO,2025-07,DEACTIVATION\n",
    )
    .unwrap();
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();

    let extract = DirectoryExtractSource::new(extract_dir.path())
        .load_period(july_2025())
        .unwrap();
    let summary = test_helpers::coordinator(&db_path, PipelineConfig::for_period(2025, 7)).run(&extract);

    assert_eq!(summary.status, RunStatus::SuccessNoData);
    assert_eq!(summary.records_inserted, 1);
}
