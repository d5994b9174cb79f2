// ==========================================
// Gambar Kerja (施工图) 集成测试
// ==========================================
// 场景: 合同签订 -> 开启 -> 响应 -> 上传 -> 修改 -> 审批; PM 响应
// ==========================================


use interior_workflow::domain::stage::Actor;
use interior_workflow::domain::types::{GambarKerjaStatus, Tahap, TaskStatus};
use interior_workflow::engine::WorkflowError;
use test_helpers::{ts, TestEnv};

#[test]
fn test_open_requires_kontrak() {
    let env = TestEnv::new();
    let id = env.create_order("Rumah Tebet");

    let err = env.orch.open_gambar_kerja(&id, &env.admin, ts(2024, 1, 2)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::GambarKerja, .. }));

    env.to_moodboard_accepted(&id);
    env.to_fee_paid(&id);
    env.to_desain_final_accepted(&id);
    env.to_item_pekerjaan_published(&id, &[("Lemari", "Kamar")]);
    let err = env.orch.open_gambar_kerja(&id, &env.admin, ts(2024, 1, 8)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::GambarKerja, .. }));

    // 尚未开启时其他操作也被拒绝
    let err = env.orch.respond_gambar_kerja(&id, &env.admin, ts(2024, 1, 8)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::GambarKerja, .. }));
}

#[test]
fn test_drawing_review_cycle() {
    let env = TestEnv::new();
    let id = env.order_with_kontrak();
    let a = &env.admin;

    let gk = env.orch.open_gambar_kerja(&id, a, ts(2024, 1, 12)).unwrap();
    assert_eq!(gk.status, GambarKerjaStatus::Pending);
    let err = env.orch.open_gambar_kerja(&id, a, ts(2024, 1, 12)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { .. }));

    // 未响应不能上传
    let err = env
        .orch
        .upload_gambar_kerja_file(&id, "/gk/denah.dwg", "denah.dwg", a, ts(2024, 1, 12))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotYetResponded(Tahap::GambarKerja)));

    env.orch.respond_gambar_kerja(&id, a, ts(2024, 1, 13)).unwrap();
    let err = env.orch.respond_gambar_kerja(&id, a, ts(2024, 1, 13)).unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyResponded(Tahap::GambarKerja)));

    // 没有文件不能审批
    let err = env.orch.approve_gambar_kerja(&id, a, ts(2024, 1, 13)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::GambarKerja, .. }));

    env.orch
        .upload_gambar_kerja_file(&id, "/gk/denah.dwg", "denah.dwg", a, ts(2024, 1, 14))
        .unwrap();
    let agg = env.orch.load_order_aggregate(&id).unwrap();
    assert_eq!(agg.gambar_kerja.as_ref().unwrap().status, GambarKerjaStatus::Uploaded);

    let gk = env
        .orch
        .revise_gambar_kerja(&id, "tinggi kabinet atas 80cm", a, ts(2024, 1, 15))
        .unwrap();
    assert_eq!(gk.status, GambarKerjaStatus::Pending);
    assert_eq!(gk.response.revisi_notes.as_deref(), Some("tinggi kabinet atas 80cm"));

    let err = env.orch.revise_gambar_kerja(&id, "   ", a, ts(2024, 1, 15)).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput(_)));

    env.orch
        .upload_gambar_kerja_file(&id, "/gk/denah-v2.dwg", "denah-v2.dwg", a, ts(2024, 1, 16))
        .unwrap();
    let gk = env.orch.approve_gambar_kerja(&id, a, ts(2024, 1, 16)).unwrap();
    assert_eq!(gk.status, GambarKerjaStatus::Approved);
    assert_eq!(gk.files.len(), 2);

    let err = env
        .orch
        .upload_gambar_kerja_file(&id, "/gk/late.dwg", "late.dwg", a, ts(2024, 1, 17))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyApproved(Tahap::GambarKerja)));

    let task = env
        .orch
        .list_tasks(&id)
        .unwrap()
        .into_iter()
        .find(|t| t.tahap == Tahap::GambarKerja)
        .unwrap();
    assert_eq!(task.status, TaskStatus::Selesai);
}

#[test]
fn test_pm_response_is_restricted_to_project_managers() {
    let env = TestEnv::new();
    let id = env.order_with_kontrak();
    env.orch.open_gambar_kerja(&id, &env.admin, ts(2024, 1, 12)).unwrap();

    let err = env
        .orch
        .pm_respond_gambar_kerja(&id, &env.admin, ts(2024, 1, 12))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::GambarKerja, .. }));

    let pm = Actor::new("Budi PM").with_user_id("u-pm").project_manager();
    let gk = env.orch.pm_respond_gambar_kerja(&id, &pm, ts(2024, 1, 12)).unwrap();
    assert!(gk.response.has_pm_response());
    // PM 响应与普通响应互相独立
    assert!(!gk.response.is_responded());

    let err = env.orch.pm_respond_gambar_kerja(&id, &pm, ts(2024, 1, 13)).unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyResponded(Tahap::GambarKerja)));
}
