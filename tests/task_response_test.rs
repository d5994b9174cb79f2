// ==========================================
// 任务响应追踪集成测试
// ==========================================
// 场景: 阶段进入开任务 -> 响应 -> 完成; 延期; 超期扫描
// ==========================================


use chrono::Duration;
use interior_workflow::config::WorkflowSettings;
use interior_workflow::domain::types::{Tahap, TaskStatus};
use interior_workflow::engine::events::StageEventType;
use interior_workflow::engine::WorkflowError;
use test_helpers::{rab_line, ts, TestEnv};

fn task_of(env: &TestEnv, order_id: &str, tahap: Tahap) -> interior_workflow::TaskResponse {
    env.orch
        .list_tasks(order_id)
        .unwrap()
        .into_iter()
        .find(|t| t.tahap == tahap)
        .unwrap()
}

#[test]
fn test_task_lifecycle_follows_stages() {
    let env = TestEnv::new();
    let id = env.create_order("Rumah Cibubur");
    let a = &env.admin;

    env.orch.start_design(&id, a, ts(2024, 1, 1)).unwrap();
    let mb = task_of(&env, &id, Tahap::Moodboard);
    assert_eq!(mb.status, TaskStatus::MenungguResponse);
    assert_eq!(mb.deadline, ts(2024, 1, 1) + Duration::days(3));

    env.orch.respond_moodboard(&id, a, ts(2024, 1, 2)).unwrap();
    let mb = task_of(&env, &id, Tahap::Moodboard);
    assert_eq!(mb.status, TaskStatus::MenungguInput);
    assert_eq!(mb.user_id.as_deref(), Some("u-admin"));
    assert_eq!(mb.deadline, ts(2024, 1, 2) + Duration::days(6));

    env.orch
        .upload_moodboard_file(&id, "/mb/1.pdf", "1.pdf", a, ts(2024, 1, 2))
        .unwrap();
    env.orch.accept_moodboard(&id, None, a, ts(2024, 1, 3)).unwrap();
    assert_eq!(task_of(&env, &id, Tahap::Moodboard).status, TaskStatus::Selesai);
    assert_eq!(task_of(&env, &id, Tahap::Estimasi).status, TaskStatus::MenungguResponse);

    env.to_fee_paid(&id);
    env.to_desain_final_accepted(&id);
    env.to_item_pekerjaan_published(&id, &[("Lemari", "Kamar")]);
    env.to_rab_submitted(&id, vec![rab_line("Lemari", false, 1_000_000.0, 10.0, 0.0)]);

    let tahaps: Vec<Tahap> = env.orch.list_tasks(&id).unwrap().iter().map(|t| t.tahap).collect();
    assert_eq!(
        tahaps,
        vec![
            Tahap::Moodboard,
            Tahap::Estimasi,
            Tahap::CommitmentFee,
            Tahap::DesainFinal,
            Tahap::ItemPekerjaan,
            Tahap::RabInternal,
            Tahap::Kontrak,
        ]
    );
    for tahap in &tahaps[..6] {
        assert_eq!(task_of(&env, &id, *tahap).status, TaskStatus::Selesai, "{}", tahap);
    }
    assert_eq!(task_of(&env, &id, Tahap::Kontrak).status, TaskStatus::MenungguResponse);
}

#[test]
fn test_kontrak_task_uses_configured_days() {
    let env = TestEnv::with_settings(WorkflowSettings {
        kontrak_response_days: 7,
        ..WorkflowSettings::default()
    });
    let id = env.create_order("Rumah Sentul");
    env.to_moodboard_accepted(&id);
    env.to_fee_paid(&id);
    env.to_desain_final_accepted(&id);
    env.to_item_pekerjaan_published(&id, &[("Lemari", "Kamar")]);
    env.to_rab_submitted(&id, vec![rab_line("Lemari", false, 1_000_000.0, 10.0, 0.0)]);

    let kontrak = task_of(&env, &id, Tahap::Kontrak);
    assert_eq!(kontrak.deadline, ts(2024, 1, 9) + Duration::days(7));

    env.to_kontrak(&id, 1);
    assert_eq!(task_of(&env, &id, Tahap::Kontrak).status, TaskStatus::Selesai);
}

#[test]
fn test_extension_accumulates_reasons() {
    let env = TestEnv::new();
    let id = env.create_order("Rumah Bekasi");
    env.orch.start_design(&id, &env.admin, ts(2024, 1, 1)).unwrap();

    env.orch
        .request_extension(&id, Tahap::Moodboard, 2, "klien di luar kota", &env.admin, ts(2024, 1, 2))
        .unwrap();
    let task = env
        .orch
        .request_extension(&id, Tahap::Moodboard, 3, "revisi material", &env.admin, ts(2024, 1, 3))
        .unwrap();

    assert_eq!(task.extend_count, 2);
    assert_eq!(task.deadline, ts(2024, 1, 1) + Duration::days(3 + 2 + 3));
    let reason = task.extend_reason.unwrap();
    assert!(reason.contains("Perpanjangan #1: klien di luar kota"));
    assert!(reason.contains("Perpanjangan #2: revisi material"));

    let err = env
        .orch
        .request_extension(&id, Tahap::Moodboard, 31, "terlalu lama", &env.admin, ts(2024, 1, 3))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput(_)));

    let err = env
        .orch
        .request_extension(&id, Tahap::Kontrak, 1, "belum ada", &env.admin, ts(2024, 1, 3))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
}

#[test]
fn test_deadline_scan_marks_overdue_and_reminds() {
    let env = TestEnv::new();
    let late = env.create_order("Rumah Terlambat");
    env.orch.start_design(&late, &env.admin, ts(2024, 1, 1)).unwrap();

    let soon = env.create_order("Rumah Besok");
    env.orch.start_design(&soon, &env.admin, ts(2024, 1, 3)).unwrap();

    // late: deadline 01-04; soon: deadline 01-06
    let now = ts(2024, 1, 5);
    let events_before = env.published.count();
    let report = env.orch.check_deadlines(now).unwrap();

    assert_eq!(report.overdue.len(), 1);
    assert_eq!(report.overdue[0].order_id, late);
    assert_eq!(report.due_tomorrow.len(), 1);
    assert_eq!(report.due_tomorrow[0].order_id, soon);
    assert_eq!(task_of(&env, &late, Tahap::Moodboard).status, TaskStatus::Telat);

    let events = env.published.events.lock().unwrap();
    let new_events: Vec<StageEventType> = events[events_before..].iter().map(|e| e.event_type).collect();
    assert_eq!(new_events, vec![StageEventType::TaskOverdue, StageEventType::DeadlineReminder]);
    drop(events);

    // 再次扫描不重复标记
    let again = env.orch.check_deadlines(now).unwrap();
    assert!(again.overdue.is_empty());

    // 超期后完成记为 telat_submit
    env.orch.respond_moodboard(&late, &env.admin, ts(2024, 1, 6)).unwrap();
    env.orch
        .upload_moodboard_file(&late, "/mb/1.pdf", "1.pdf", &env.admin, ts(2024, 1, 6))
        .unwrap();
    env.orch.accept_moodboard(&late, None, &env.admin, ts(2024, 1, 7)).unwrap();
    assert_eq!(task_of(&env, &late, Tahap::Moodboard).status, TaskStatus::TelatSubmit);
}
