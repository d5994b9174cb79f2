// ==========================================
// RAB 派生版本集成测试
// ==========================================
// 场景: RAB Internal 提交 -> Kontrak / Vendor / Jasa 生成 -> 合同金额
// ==========================================


use interior_workflow::domain::types::{RabVariant, Tahap, WorkflowStage};
use interior_workflow::engine::{NewKontrak, RabLineInput, WorkflowError};
use test_helpers::{rab_line, ts, TestEnv};

/// Kitchen Set: 6_000_000 / 0.75 = 8_000_000, qty 2, diskon 10%
/// Handle (aksesoris): 40_000 / 0.8 = 50_000, qty 10
/// HPL: 900_000 / 0.9 = 1_000_000, qty 1
fn sample_lines(produk_id: &str) -> Vec<RabLineInput> {
    vec![
        RabLineInput {
            produk_id: Some(produk_id.to_string()),
            nama_item: "Kitchen Set".to_string(),
            is_aksesoris: false,
            quantity: 2.0,
            harga_dasar: 6_000_000.0,
            markup_pct: 25.0,
            diskon_pct: 10.0,
            harga_jasa: Some(1_500_000.0),
        },
        RabLineInput {
            quantity: 10.0,
            ..rab_line("Handle", true, 40_000.0, 20.0, 0.0)
        },
        rab_line("HPL Finishing", false, 900_000.0, 10.0, 0.0),
    ]
}

fn submitted_order(env: &TestEnv) -> String {
    let id = env.create_order("Apartemen Senayan");
    env.to_moodboard_accepted(&id);
    env.to_fee_paid(&id);
    env.to_desain_final_accepted(&id);
    let produk_ids = env.to_item_pekerjaan_published(&id, &[("Kitchen Set", "Dapur")]);
    env.to_rab_submitted(&id, sample_lines(&produk_ids[0]));
    id
}

#[test]
fn test_three_variants_priced_from_locked_source() {
    let env = TestEnv::new();
    let id = submitted_order(&env);

    let kontrak = env
        .orch
        .generate_rab_variant(&id, RabVariant::Kontrak, &env.admin, ts(2024, 1, 10))
        .unwrap();
    let names: Vec<&str> = kontrak.rows.iter().map(|r| r.nama_item.as_str()).collect();
    assert_eq!(names, vec!["Kitchen Set", "Handle", "HPL Finishing"]);
    assert_eq!(kontrak.rows[0].harga_satuan, 8_000_000.0);
    assert_eq!(kontrak.rows[0].harga_total, 14_400_000.0);
    assert_eq!(kontrak.rows[1].harga_total, 500_000.0);
    assert_eq!(kontrak.rows[2].harga_total, 1_000_000.0);
    assert_eq!(kontrak.total(), 15_900_000.0);

    let vendor = env
        .orch
        .generate_rab_variant(&id, RabVariant::Vendor, &env.admin, ts(2024, 1, 10))
        .unwrap();
    assert_eq!(vendor.rows.len(), 3);
    assert!(vendor.rows.iter().all(|r| r.diskon_pct == 0.0));
    assert_eq!(vendor.total(), 13_300_000.0);

    let jasa = env
        .orch
        .generate_rab_variant(&id, RabVariant::Jasa, &env.admin, ts(2024, 1, 10))
        .unwrap();
    assert_eq!(jasa.rows.len(), 2);
    assert!(jasa.rows.iter().all(|r| !r.is_aksesoris));
    assert_eq!(jasa.rows[0].harga_satuan, 1_500_000.0);
    // 无 harga_jasa 时回退到 harga_dasar
    assert_eq!(jasa.rows[1].harga_satuan, 900_000.0);
    assert_eq!(jasa.total(), 3_900_000.0);

    let k = env
        .orch
        .create_kontrak(&id, NewKontrak { durasi_kontrak: 60, termin_count: 3 }, &env.admin, ts(2024, 1, 11))
        .unwrap();
    assert_eq!(k.harga_kontrak, 15_900_000.0);

    // 来源不被改写
    let agg = env.orch.load_order_aggregate(&id).unwrap();
    let rab = agg.rab_internal.unwrap();
    assert!(rab.is_submitted);
    assert_eq!(rab.lines.len(), 3);
    assert_eq!(rab.lines[0].harga_dasar, 6_000_000.0);
}

#[test]
fn test_regeneration_replaces_with_identical_content() {
    let env = TestEnv::new();
    let id = submitted_order(&env);

    let first = env
        .orch
        .generate_rab_variant(&id, RabVariant::Kontrak, &env.admin, ts(2024, 1, 10))
        .unwrap();
    let second = env
        .orch
        .generate_rab_variant(&id, RabVariant::Kontrak, &env.admin, ts(2024, 1, 12))
        .unwrap();

    let keys = |set: &interior_workflow::RabVariantSet| {
        set.rows.iter().map(|r| r.content_key()).collect::<Vec<_>>()
    };
    assert_eq!(keys(&first), keys(&second));

    let agg = env.orch.load_order_aggregate(&id).unwrap();
    assert_eq!(agg.rab_variants.len(), 1);
    assert_eq!(agg.variant(RabVariant::Kontrak).unwrap().rows.len(), 3);
    assert_eq!(agg.order.tahapan, WorkflowStage::RabInternalSubmitted);
}

#[test]
fn test_unsubmitted_source_is_not_locked() {
    let env = TestEnv::new();
    let id = env.create_order("Rumah Cipete");
    env.to_moodboard_accepted(&id);
    env.to_fee_paid(&id);
    env.to_desain_final_accepted(&id);
    env.to_item_pekerjaan_published(&id, &[("Meja Makan", "Ruang Makan")]);
    env.orch.respond_rab_internal(&id, &env.admin, ts(2024, 1, 8)).unwrap();
    env.orch
        .set_rab_internal_lines(&id, vec![rab_line("Meja Makan", false, 3_000_000.0, 25.0, 0.0)], &env.admin, ts(2024, 1, 8))
        .unwrap();

    let logs_before = env.action_count(&id);
    for variant in RabVariant::ALL {
        let err = env
            .orch
            .generate_rab_variant(&id, variant, &env.admin, ts(2024, 1, 9))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::SourceNotLocked(t) if t == variant.tahap()));
    }
    assert_eq!(env.action_count(&id), logs_before);
    assert!(env.orch.load_order_aggregate(&id).unwrap().rab_variants.is_empty());
}

#[test]
fn test_invalid_lines_rejected_before_write() {
    let env = TestEnv::new();
    let id = env.create_order("Rumah Pondok Indah");
    env.to_moodboard_accepted(&id);
    env.to_fee_paid(&id);
    env.to_desain_final_accepted(&id);
    env.to_item_pekerjaan_published(&id, &[("Lemari", "Kamar")]);
    env.orch.respond_rab_internal(&id, &env.admin, ts(2024, 1, 8)).unwrap();

    let err = env
        .orch
        .set_rab_internal_lines(&id, vec![rab_line("Lemari", false, 1_000.0, 100.0, 0.0)], &env.admin, ts(2024, 1, 8))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput(_)));

    let err = env
        .orch
        .set_rab_internal_lines(
            &id,
            vec![RabLineInput {
                produk_id: Some("produk-lain".to_string()),
                ..rab_line("Lemari", false, 1_000.0, 10.0, 0.0)
            }],
            &env.admin,
            ts(2024, 1, 8),
        )
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));

    // 空行集不能提交
    let err = env.orch.submit_rab_internal(&id, &env.admin, ts(2024, 1, 9)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::RabInternal, .. }));
}

#[test]
fn test_reopened_rab_regenerates_from_new_lines_only() {
    let env = TestEnv::new();
    let a = &env.admin;
    let id = env.create_order("Rumah Kemang");
    env.to_moodboard_accepted(&id);
    env.to_fee_paid(&id);
    env.to_desain_final_accepted(&id);
    env.to_item_pekerjaan_published(&id, &[("Lemari", "Kamar")]);
    env.to_rab_submitted(
        &id,
        vec![
            rab_line("Lemari Pakaian", false, 4_000_000.0, 20.0, 0.0),
            rab_line("Handle Lemari", true, 40_000.0, 20.0, 0.0),
        ],
    );
    for variant in RabVariant::ALL {
        env.orch.generate_rab_variant(&id, variant, a, ts(2024, 1, 10)).unwrap();
    }

    // 提交后直接修改被拒绝
    let err = env
        .orch
        .set_rab_internal_lines(&id, vec![rab_line("Meja Kerja", false, 2_000_000.0, 20.0, 0.0)], a, ts(2024, 1, 11))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::RabInternal, .. }));

    let rab = env.orch.reopen_rab_internal(&id, a, ts(2024, 1, 11)).unwrap();
    assert!(!rab.is_submitted);
    assert!(rab.submitted_at.is_none());
    assert!(rab.submitted_by.is_none());
    let agg = env.orch.load_order_aggregate(&id).unwrap();
    assert_eq!(agg.order.tahapan, WorkflowStage::ItemPekerjaanDefined);
    assert!(agg.rab_variants.is_empty());

    // 未提交: 不能生成, 也不能再次撤回
    let err = env
        .orch
        .generate_rab_variant(&id, RabVariant::Kontrak, a, ts(2024, 1, 11))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::SourceNotLocked(Tahap::RabKontrak)));
    let err = env.orch.reopen_rab_internal(&id, a, ts(2024, 1, 11)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::RabInternal, .. }));

    env.orch
        .set_rab_internal_lines(&id, vec![rab_line("Meja Kerja", false, 2_000_000.0, 20.0, 0.0)], a, ts(2024, 1, 11))
        .unwrap();
    env.orch.submit_rab_internal(&id, a, ts(2024, 1, 12)).unwrap();
    assert_eq!(
        env.orch.load_order_aggregate(&id).unwrap().order.tahapan,
        WorkflowStage::RabInternalSubmitted
    );

    let kontrak = env
        .orch
        .generate_rab_variant(&id, RabVariant::Kontrak, a, ts(2024, 1, 12))
        .unwrap();
    let names: Vec<&str> = kontrak.rows.iter().map(|r| r.nama_item.as_str()).collect();
    assert_eq!(names, vec!["Meja Kerja"]);
    assert_eq!(
        env.orch.load_order_aggregate(&id).unwrap().order.tahapan,
        WorkflowStage::RabInternalSubmitted
    );
    env.orch.generate_rab_variant(&id, RabVariant::Vendor, a, ts(2024, 1, 12)).unwrap();
    env.orch.generate_rab_variant(&id, RabVariant::Jasa, a, ts(2024, 1, 12)).unwrap();

    let agg = env.orch.load_order_aggregate(&id).unwrap();
    assert_eq!(agg.order.tahapan, WorkflowStage::RabVariantsGenerated);
    let ip_id = agg.item_pekerjaan.unwrap().item.item_pekerjaan_id;
    {
        let conn = env.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT nama_item FROM rab_variant_rows WHERE item_pekerjaan_id = ?1 ORDER BY variant")
            .unwrap();
        let stored: Vec<String> = stmt
            .query_map([&ip_id], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(stored, vec!["Meja Kerja"; 3]);
    }

    let k = env
        .orch
        .create_kontrak(&id, NewKontrak { durasi_kontrak: 30, termin_count: 2 }, a, ts(2024, 1, 13))
        .unwrap();
    // 2_000_000 / 0.8
    assert_eq!(k.harga_kontrak, 2_500_000.0);

    // Kontrak 创建后不能撤回
    let err = env.orch.reopen_rab_internal(&id, a, ts(2024, 1, 14)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::RabInternal, .. }));
    assert!(env.orch.load_order_aggregate(&id).unwrap().rab_internal.unwrap().is_submitted);
}
