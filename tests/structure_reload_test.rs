// ==========================================
// 组合结构重载集成测试
// ==========================================
// 测试目标: 整体替换的原子性（中途失败时旧结构完整保留）
// ==========================================


use sinapi_sync::config::PipelineConfig;
use sinapi_sync::domain::{ItemKind, PeriodExtract, ReferenceExtract, RunState, RunStatus, StructureEdge};
use sinapi_sync::engine::StructureReloader;
use sinapi_sync::logging;
use sinapi_sync::repository::{StructureRepository, DEFAULT_MAX_EXPLOSION_DEPTH};
use test_helpers::{catalog, edge};

fn reference(edges: Vec<sinapi_sync::domain::StructureEdgeRecord>) -> ReferenceExtract {
    ReferenceExtract {
        elementary: vec![catalog(1, 10, "CIMENTO"), catalog(2, 11, "AREIA"), catalog(3, 12, "CAL")],
        assemblies: vec![catalog(1, 100, "ARGAMASSA"), catalog(2, 200, "REBOCO")],
        edges,
        ..Default::default()
    }
}

fn stored_edges(db_path: &str) -> Vec<StructureEdge> {
    StructureRepository::new(&test_helpers::open(db_path))
        .load_all()
        .unwrap()
}

const FAIL_ON_CAL: &str = r#"
    CREATE TRIGGER fail_on_cal BEFORE INSERT ON assembly_elementary_edge
    WHEN NEW.child_code = 12
    BEGIN
        SELECT RAISE(ABORT, 'injected edge failure');
    END;
"#;

#[test]
fn test_failed_reload_leaves_previous_structure_intact() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();

    let initial = PeriodExtract {
        history: vec![],
        reference: Some(reference(vec![
            edge(1, 100, 10, ItemKind::Elementary, 0.5),
            edge(2, 100, 11, ItemKind::Elementary, 2.0),
            edge(3, 200, 100, ItemKind::Assembly, 0.1),
        ])),
    };
    let summary = test_helpers::coordinator(&db_path, PipelineConfig::for_period(2025, 6)).run(&initial);
    assert_eq!(summary.status, RunStatus::Success);
    let before = stored_edges(&db_path);
    assert_eq!(before.len(), 3);

    test_helpers::open(&db_path).execute_batch(FAIL_ON_CAL).unwrap();

    // 新结构的第二条边触发失败：第一条已写入、旧边已清空，均须回滚
    let replacement = PeriodExtract {
        history: vec![],
        reference: Some(reference(vec![
            edge(1, 100, 10, ItemKind::Elementary, 0.7),
            edge(2, 100, 12, ItemKind::Elementary, 1.0),
        ])),
    };
    let summary = test_helpers::coordinator(&db_path, PipelineConfig::for_period(2025, 7)).run(&replacement);

    assert_eq!(summary.status, RunStatus::Failure);
    assert_eq!(summary.last_completed_phase, RunState::CatalogUpserted);
    assert!(summary.message.contains("STRUCTURE"));
    assert_eq!(stored_edges(&db_path), before);
}

#[test]
fn test_reloader_error_rolls_back_directly() {
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();
    let mut conn = test_helpers::open(&db_path);
    conn.execute_batch(
        r#"
        INSERT INTO elementary_item (code, description) VALUES (10, 'CIMENTO'), (12, 'CAL');
        INSERT INTO assembly_item (code, description) VALUES (100, 'ARGAMASSA');
        "#,
    )
    .unwrap();

    let reloader = StructureReloader::new();
    reloader
        .reload(&mut conn, &[edge(1, 100, 10, ItemKind::Elementary, 0.5)])
        .unwrap();
    conn.execute_batch(FAIL_ON_CAL).unwrap();

    let result = reloader.reload(
        &mut conn,
        &[
            edge(1, 100, 10, ItemKind::Elementary, 0.9),
            edge(2, 100, 12, ItemKind::Elementary, 1.0),
        ],
    );

    assert!(result.is_err());
    let edges = StructureRepository::new(&conn).load_all().unwrap();
    assert_eq!(edges.len(), 1);
    assert!((edges[0].coefficient - 0.5).abs() < 1e-9);
}

#[test]
fn test_stale_edges_do_not_survive_reload() {
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();
    let first = PeriodExtract {
        history: vec![],
        reference: Some(reference(vec![
            edge(1, 100, 10, ItemKind::Elementary, 0.5),
            edge(2, 100, 11, ItemKind::Elementary, 2.0),
        ])),
    };
    test_helpers::coordinator(&db_path, PipelineConfig::for_period(2025, 6)).run(&first);

    let second = PeriodExtract {
        history: vec![],
        reference: Some(reference(vec![
            edge(1, 100, 12, ItemKind::Elementary, 0.3),
            edge(2, 200, 100, ItemKind::Assembly, 1.5),
        ])),
    };
    let summary = test_helpers::coordinator(&db_path, PipelineConfig::for_period(2025, 7)).run(&second);

    let stats = summary.stats_for("assembly_elementary_edge").unwrap();
    assert_eq!((stats.inserted, stats.deleted), (1, 2));

    let conn = test_helpers::open(&db_path);
    let exploded = StructureRepository::new(&conn)
        .explode_assembly(200, DEFAULT_MAX_EXPLOSION_DEPTH)
        .unwrap();
    let codes: Vec<_> = exploded.iter().map(|c| (c.item_kind, c.item_code)).collect();
    assert_eq!(codes, vec![(ItemKind::Assembly, 100), (ItemKind::Elementary, 12)]);
    assert!((exploded[1].accumulated_coefficient - 0.45).abs() < 1e-9);
}
