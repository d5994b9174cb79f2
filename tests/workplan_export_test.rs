// ==========================================
// 工作计划导出集成测试
// ==========================================
// 场景: 合同签订 -> 分期发票付款 -> 产品工作计划 -> 表格导出
// ==========================================


use interior_workflow::app::AppState;
use interior_workflow::domain::types::Tahap;
use interior_workflow::engine::workplan_export::COLUMN_HEADER;
use interior_workflow::engine::{NewInvoice, WorkflowError, WorkplanEntry};
use test_helpers::{date, rab_line, ts, TestEnv};

fn entry(nama: &str, start: (u32, u32), end: (u32, u32)) -> WorkplanEntry {
    WorkplanEntry {
        nama_tahapan: nama.to_string(),
        start_date: Some(date(2024, start.0, start.1)),
        end_date: Some(date(2024, end.0, end.1)),
        status: None,
    }
}

/// 两个 Living Room 产品, 已签合同 (3 期)
fn living_room_order(env: &TestEnv) -> (String, Vec<String>) {
    let id = env.create_order("Rumah Kemang");
    env.to_moodboard_accepted(&id);
    env.to_fee_paid(&id);
    env.to_desain_final_accepted(&id);
    let produk_ids = env.to_item_pekerjaan_published(&id, &[("Sofa", "Living Room"), ("Rak TV", "Living Room")]);
    env.to_rab_submitted(
        &id,
        vec![
            rab_line("Sofa", false, 4_000_000.0, 20.0, 0.0),
            rab_line("Rak TV", false, 2_000_000.0, 20.0, 0.0),
        ],
    );
    env.to_kontrak(&id, 3);

    env.orch
        .set_workplan(&id, &produk_ids[0], vec![entry("Produksi", (1, 1), (1, 10))], &env.admin, ts(2024, 1, 12))
        .unwrap();
    env.orch
        .set_workplan(
            &id,
            &produk_ids[1],
            vec![entry("Produksi", (1, 5), (1, 12)), entry("Instalasi", (1, 13), (1, 20))],
            &env.admin,
            ts(2024, 1, 12),
        )
        .unwrap();
    (id, produk_ids)
}

fn pay_termin(env: &TestEnv, order_id: &str, termin_step: i64) {
    let invoice = env
        .orch
        .create_invoice(order_id, NewInvoice { termin_step, amount: 3_000_000.0 }, &env.admin, ts(2024, 1, 13))
        .unwrap();
    env.orch
        .pay_invoice(order_id, &invoice.invoice_id, "/files/bukti-termin.jpg", &env.admin, ts(2024, 1, 14))
        .unwrap();
}

#[test]
fn test_living_room_export_rows() {
    let env = TestEnv::new();
    let (id, _) = living_room_order(&env);
    pay_termin(&env, &id, 1);

    let export = env.orch.build_workplan_export(&id).unwrap();
    assert_eq!(export.rows[0], vec!["Project", "Rumah Kemang"]);
    assert_eq!(export.rows[3], COLUMN_HEADER.to_vec());
    assert_eq!(
        export.body().to_vec(),
        vec![
            vec!["Living Room", "Sofa", "01/01/2024", "10/01/2024"],
            vec!["", "Rak TV", "05/01/2024", "20/01/2024"],
        ]
    );
}

#[test]
fn test_export_requires_paid_termin() {
    let env = TestEnv::new();
    let (id, _) = living_room_order(&env);

    let err = env.orch.build_workplan_export(&id).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::Workplan, .. }));

    // 仅 DP (termin 0) 已付款不解锁
    pay_termin(&env, &id, 0);
    let err = env.orch.build_workplan_export(&id).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::Workplan, .. }));

    // 开票未付款也不解锁
    env.orch
        .create_invoice(&id, NewInvoice { termin_step: 1, amount: 1_000.0 }, &env.admin, ts(2024, 1, 15))
        .unwrap();
    assert!(env.orch.build_workplan_export(&id).is_err());
}

#[test]
fn test_invoice_rules() {
    let env = TestEnv::new();
    let (id, _) = living_room_order(&env);

    let err = env
        .orch
        .create_invoice(&id, NewInvoice { termin_step: 4, amount: 1_000.0 }, &env.admin, ts(2024, 1, 13))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput(_)));

    let invoice = env
        .orch
        .create_invoice(&id, NewInvoice { termin_step: 2, amount: 1_234.567 }, &env.admin, ts(2024, 1, 13))
        .unwrap();
    assert_eq!(invoice.amount, 1_234.57);

    let err = env
        .orch
        .create_invoice(&id, NewInvoice { termin_step: 2, amount: 1_000.0 }, &env.admin, ts(2024, 1, 13))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput(_)));

    env.orch
        .pay_invoice(&id, &invoice.invoice_id, "/bukti.jpg", &env.admin, ts(2024, 1, 14))
        .unwrap();
    let err = env
        .orch
        .pay_invoice(&id, &invoice.invoice_id, "/bukti.jpg", &env.admin, ts(2024, 1, 15))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyApproved(Tahap::Invoice)));

    let err = env
        .orch
        .pay_invoice(&id, "invoice-x", "/bukti.jpg", &env.admin, ts(2024, 1, 15))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
}

#[test]
fn test_invoice_requires_kontrak() {
    let env = TestEnv::new();
    let id = env.create_order("Rumah Bogor");
    env.to_moodboard_accepted(&id);
    env.to_fee_paid(&id);
    env.to_desain_final_accepted(&id);
    env.to_item_pekerjaan_published(&id, &[("Lemari", "Kamar")]);

    let err = env
        .orch
        .create_invoice(&id, NewInvoice { termin_step: 1, amount: 1_000.0 }, &env.admin, ts(2024, 1, 13))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::Invoice, .. }));
}

#[test]
fn test_workplan_dates_validated() {
    let env = TestEnv::new();
    let (id, produk_ids) = living_room_order(&env);

    let err = env
        .orch
        .set_workplan(&id, &produk_ids[0], vec![entry("Produksi", (2, 10), (2, 1))], &env.admin, ts(2024, 1, 12))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput(_)));

    let err = env
        .orch
        .set_workplan(&id, "produk-x", vec![entry("Produksi", (2, 1), (2, 10))], &env.admin, ts(2024, 1, 12))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));

    // 整组替换
    let items = env
        .orch
        .set_workplan(&id, &produk_ids[0], vec![entry("Finishing", (3, 1), (3, 5))], &env.admin, ts(2024, 1, 12))
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status, "not_started");
    let agg = env.orch.load_order_aggregate(&id).unwrap();
    let sofa = agg.item_pekerjaan.unwrap().produks.into_iter().find(|p| p.produk_id == produk_ids[0]).unwrap();
    assert_eq!(sofa.workplan_items.len(), 1);
    assert_eq!(sofa.workplan_start(), Some(date(2024, 3, 1)));
}

#[test]
fn test_export_to_csv_file_through_api() {
    let env = TestEnv::new();
    let (id, _) = living_room_order(&env);
    pay_termin(&env, &id, 1);

    let state = AppState::new(env.db_path.clone()).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let out = out_dir.path().join("workplan.csv");

    let rows = state.workflow_api.export_workplan_to_file(&id, &out).unwrap();
    assert_eq!(rows, 2);

    let content = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "Project,Rumah Kemang");
    assert_eq!(lines[3], "Ruangan,Produk,Mulai,Selesai");
    assert_eq!(lines[4], "Living Room,Sofa,01/01/2024,10/01/2024");
    assert_eq!(lines[5], ",Rak TV,05/01/2024,20/01/2024");

    assert_eq!(state.workflow_api.export_workplan_csv(&id).unwrap(), content);
}
