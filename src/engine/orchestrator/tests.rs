use super::*;
use crate::domain::types::{RabVariant, TaskStatus};
use crate::engine::events::{StageEventPublisher, StageEventType};
use crate::repository::test_support::{setup_test_db, ts};
use crate::repository::{ActionLogRepository, TaskResponseRepository};
use std::error::Error;

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<StageEvent>>,
}

impl StageEventPublisher for RecordingPublisher {
    fn publish(&self, event: StageEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.events.lock().unwrap().push(event);
        Ok(String::new())
    }
}

struct Fixture {
    conn: Arc<Mutex<Connection>>,
    orch: WorkflowOrchestrator,
    published: Arc<RecordingPublisher>,
    actor: Actor,
}

impl Fixture {
    fn new() -> Self {
        let conn = setup_test_db();
        let published = Arc::new(RecordingPublisher::default());
        let orch = WorkflowOrchestrator::new(
            conn.clone(),
            WorkflowSettings::default(),
            OptionalEventPublisher::with_publisher(published.clone()),
        );
        Self {
            conn,
            orch,
            published,
            actor: Actor::new("admin").with_user_id("u-admin"),
        }
    }

    fn log_count(&self, order_id: &str) -> i64 {
        ActionLogRepository::new(self.conn.clone())
            .count_by_order(order_id)
            .unwrap()
    }

    fn event_count(&self) -> usize {
        self.published.events.lock().unwrap().len()
    }

    fn order(&self) -> String {
        self.orch
            .create_order(
                NewOrder {
                    nama_project: "Apartemen Kuningan".to_string(),
                    company_name: "PT Ruang Rapi".to_string(),
                    customer_name: "Dewi".to_string(),
                    customer_phone: None,
                },
                &self.actor,
                ts(2024, 1, 1),
            )
            .unwrap()
            .order_id
    }

    /// 推进到 moodboard_accepted
    fn accepted(&self) -> String {
        let id = self.order();
        self.orch.start_design(&id, &self.actor, ts(2024, 1, 1)).unwrap();
        self.orch.respond_moodboard(&id, &self.actor, ts(2024, 1, 2)).unwrap();
        self.orch
            .upload_moodboard_file(&id, "/mb/v1.pdf", "v1.pdf", &self.actor, ts(2024, 1, 2))
            .unwrap();
        self.orch.accept_moodboard(&id, None, &self.actor, ts(2024, 1, 3)).unwrap();
        id
    }

    /// 推进到 commitment_fee_paid
    fn paid(&self) -> String {
        let id = self.accepted();
        self.orch.store_estimasi(&id, Some("/est.pdf".to_string()), &self.actor, ts(2024, 1, 4)).unwrap();
        self.orch.respond_commitment_fee(&id, &self.actor, ts(2024, 1, 4)).unwrap();
        self.orch.set_commitment_fee(&id, 2_500_000.0, &self.actor, ts(2024, 1, 4)).unwrap();
        self.orch.pay_commitment_fee(&id, "/bukti.jpg", &self.actor, ts(2024, 1, 5)).unwrap();
        id
    }

    /// 推进到 desain_final_accepted
    fn designed(&self) -> String {
        let id = self.paid();
        self.orch.respond_desain_final(&id, &self.actor, ts(2024, 1, 5)).unwrap();
        self.orch
            .upload_desain_final_file(&id, "/final/v1.pdf", "v1.pdf", &self.actor, ts(2024, 1, 5))
            .unwrap();
        self.orch.accept_desain_final(&id, None, &self.actor, ts(2024, 1, 6)).unwrap();
        id
    }

    /// 推进到 rab_internal_submitted
    fn submitted(&self) -> String {
        let id = self.designed();
        self.orch.respond_item_pekerjaan(&id, &self.actor, ts(2024, 1, 6)).unwrap();
        self.orch
            .add_produk(
                &id,
                NewProduk {
                    nama_produk: "Kitchen Set".to_string(),
                    nama_ruangan: "Dapur".to_string(),
                    quantity: 1,
                    panjang: Some(3.2),
                    lebar: None,
                    tinggi: None,
                },
                &self.actor,
                ts(2024, 1, 6),
            )
            .unwrap();
        self.orch.publish_item_pekerjaan(&id, &self.actor, ts(2024, 1, 6)).unwrap();
        self.orch.respond_rab_internal(&id, &self.actor, ts(2024, 1, 7)).unwrap();
        self.orch
            .set_rab_internal_lines(
                &id,
                vec![
                    line("Kabinet atas", false, 1_000_000.0, 20.0, 10.0),
                    line("Handle", true, 50_000.0, 0.0, 0.0),
                ],
                &self.actor,
                ts(2024, 1, 7),
            )
            .unwrap();
        self.orch.submit_rab_internal(&id, &self.actor, ts(2024, 1, 8)).unwrap();
        id
    }
}

fn line(nama: &str, aksesoris: bool, dasar: f64, markup: f64, diskon: f64) -> RabLineInput {
    RabLineInput {
        produk_id: None,
        nama_item: nama.to_string(),
        is_aksesoris: aksesoris,
        quantity: 1.0,
        harga_dasar: dasar,
        markup_pct: markup,
        diskon_pct: diskon,
        harga_jasa: None,
    }
}

#[test]
fn test_happy_path_reaches_kontrak() {
    let f = Fixture::new();
    let id = f.submitted();
    for variant in RabVariant::ALL {
        f.orch.generate_rab_variant(&id, variant, &f.actor, ts(2024, 1, 9)).unwrap();
    }
    let kontrak = f
        .orch
        .create_kontrak(&id, NewKontrak { durasi_kontrak: 60, termin_count: 3 }, &f.actor, ts(2024, 1, 10))
        .unwrap();

    // 1_000_000 / 0.8 * 0.9 + 50_000
    assert_eq!(kontrak.harga_kontrak, 1_175_000.0);

    let agg = f.orch.load_order_aggregate(&id).unwrap();
    assert_eq!(agg.order.tahapan, WorkflowStage::KontrakCreated);
    assert_eq!(agg.order.payment_status.as_deref(), Some(PAYMENT_STATUS_COMMITMENT_FEE));
    assert!(agg.all_variants_generated());
    assert_eq!(agg.variant(RabVariant::Jasa).unwrap().rows.len(), 1);
    assert!(agg.kontrak.is_some());
}

#[test]
fn test_rejected_operation_writes_nothing() {
    let f = Fixture::new();
    let id = f.order();
    f.orch.start_design(&id, &f.actor, ts(2024, 1, 1)).unwrap();
    f.orch.respond_moodboard(&id, &f.actor, ts(2024, 1, 2)).unwrap();

    let logs_before = f.log_count(&id);
    let events_before = f.event_count();

    let err = f.orch.accept_moodboard(&id, None, &f.actor, ts(2024, 1, 3)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::Moodboard, .. }));

    assert_eq!(f.log_count(&id), logs_before);
    assert_eq!(f.event_count(), events_before);
    let agg = f.orch.load_order_aggregate(&id).unwrap();
    assert_eq!(agg.order.tahapan, WorkflowStage::MoodboardResponded);
    assert!(!agg.moodboard.unwrap().accepted);
}

#[test]
fn test_respond_twice_keeps_first_response() {
    let f = Fixture::new();
    let id = f.order();
    f.orch.start_design(&id, &f.actor, ts(2024, 1, 1)).unwrap();
    f.orch.respond_moodboard(&id, &f.actor, ts(2024, 1, 2)).unwrap();

    let other = Actor::new("desainer-2");
    let err = f.orch.respond_moodboard(&id, &other, ts(2024, 1, 3)).unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyResponded(Tahap::Moodboard)));

    let mb = f.orch.load_order_aggregate(&id).unwrap().moodboard.unwrap();
    assert_eq!(mb.response.response_time, Some(ts(2024, 1, 2)));
    assert_eq!(mb.response.response_by.as_deref(), Some("admin"));
}

#[test]
fn test_estimasi_requires_accepted_moodboard() {
    let f = Fixture::new();
    let id = f.order();
    f.orch.start_design(&id, &f.actor, ts(2024, 1, 1)).unwrap();

    let err = f.orch.store_estimasi(&id, None, &f.actor, ts(2024, 1, 2)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::Estimasi, .. }));
    assert!(f.orch.load_order_aggregate(&id).unwrap().estimasi.is_none());
}

#[test]
fn test_revise_reopens_until_estimasi_exists() {
    let f = Fixture::new();
    let id = f.accepted();

    let mb = f.orch.revise_moodboard(&id, "ganti warna kayu", &f.actor, ts(2024, 1, 4)).unwrap();
    assert!(!mb.accepted);
    assert_eq!(
        f.orch.load_order_aggregate(&id).unwrap().order.tahapan,
        WorkflowStage::MoodboardResponded
    );

    f.orch.upload_moodboard_file(&id, "/mb/v2.pdf", "v2.pdf", &f.actor, ts(2024, 1, 5)).unwrap();
    let mb = f.orch.accept_moodboard(&id, None, &f.actor, ts(2024, 1, 6)).unwrap();
    let v2 = mb.files.iter().find(|file| file.original_name == "v2.pdf").unwrap();
    assert_eq!(mb.selected_file.as_deref(), Some(v2.file_id.as_str()));

    f.orch.store_estimasi(&id, None, &f.actor, ts(2024, 1, 7)).unwrap();
    let err = f.orch.revise_moodboard(&id, "lagi", &f.actor, ts(2024, 1, 8)).unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyApproved(Tahap::Moodboard)));
}

#[test]
fn test_reset_commitment_fee_reverts_stage() {
    let f = Fixture::new();
    let id = f.paid();

    let fee = f.orch.reset_commitment_fee(&id, &f.actor, ts(2024, 1, 6)).unwrap();
    assert!(fee.total_fee.is_none());
    assert!(!fee.is_paid());

    let agg = f.orch.load_order_aggregate(&id).unwrap();
    assert_eq!(agg.order.tahapan, WorkflowStage::EstimasiResponded);
    assert!(agg.order.payment_status.is_none());

    let err = f.orch.respond_item_pekerjaan(&id, &f.actor, ts(2024, 1, 6)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::ItemPekerjaan, .. }));
}

#[test]
fn test_reset_blocked_once_desain_final_exists() {
    let f = Fixture::new();
    let id = f.paid();
    f.orch.respond_desain_final(&id, &f.actor, ts(2024, 1, 6)).unwrap();

    let err = f.orch.reset_commitment_fee(&id, &f.actor, ts(2024, 1, 7)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::CommitmentFee, .. }));
}

#[test]
fn test_item_pekerjaan_waits_for_desain_final() {
    let f = Fixture::new();
    let id = f.paid();
    assert_eq!(
        f.orch.load_order_aggregate(&id).unwrap().order.tahapan,
        WorkflowStage::CommitmentFeePaid
    );

    let err = f.orch.respond_item_pekerjaan(&id, &f.actor, ts(2024, 1, 5)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::ItemPekerjaan, .. }));

    f.orch.respond_desain_final(&id, &f.actor, ts(2024, 1, 5)).unwrap();
    let err = f.orch.accept_desain_final(&id, None, &f.actor, ts(2024, 1, 5)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::DesainFinal, .. }));
    f.orch
        .upload_desain_final_file(&id, "/final/v1.pdf", "v1.pdf", &f.actor, ts(2024, 1, 5))
        .unwrap();
    let err = f.orch.respond_item_pekerjaan(&id, &f.actor, ts(2024, 1, 5)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::ItemPekerjaan, .. }));

    f.orch.accept_desain_final(&id, None, &f.actor, ts(2024, 1, 6)).unwrap();
    let agg = f.orch.load_order_aggregate(&id).unwrap();
    assert_eq!(agg.order.tahapan, WorkflowStage::DesainFinalAccepted);
    assert!(agg.desain_final.unwrap().is_accepted());
    f.orch.respond_item_pekerjaan(&id, &f.actor, ts(2024, 1, 6)).unwrap();
}

#[test]
fn test_desain_final_revise_reopens_until_item_pekerjaan_exists() {
    let f = Fixture::new();
    let id = f.designed();

    let df = f.orch.revise_desain_final(&id, "ubah finishing hpl", &f.actor, ts(2024, 1, 7)).unwrap();
    assert!(!df.is_accepted());
    assert!(df.selected_file.is_none());
    assert_eq!(df.notes.as_deref(), Some("ubah finishing hpl"));
    assert_eq!(
        f.orch.load_order_aggregate(&id).unwrap().order.tahapan,
        WorkflowStage::DesainFinalResponded
    );
    let err = f.orch.respond_item_pekerjaan(&id, &f.actor, ts(2024, 1, 7)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::ItemPekerjaan, .. }));

    let v2 = f
        .orch
        .upload_desain_final_file(&id, "/final/v2.pdf", "v2.pdf", &f.actor, ts(2024, 1, 8))
        .unwrap();
    let df = f.orch.accept_desain_final(&id, Some(&v2.file_id), &f.actor, ts(2024, 1, 8)).unwrap();
    assert_eq!(df.selected_file.as_deref(), Some(v2.file_id.as_str()));

    f.orch.respond_item_pekerjaan(&id, &f.actor, ts(2024, 1, 9)).unwrap();
    let err = f.orch.revise_desain_final(&id, "lagi", &f.actor, ts(2024, 1, 9)).unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyApproved(Tahap::DesainFinal)));
}

#[test]
fn test_generate_before_submit_is_source_not_locked() {
    let f = Fixture::new();
    let id = f.designed();
    f.orch.respond_item_pekerjaan(&id, &f.actor, ts(2024, 1, 6)).unwrap();
    f.orch
        .add_produk(
            &id,
            NewProduk {
                nama_produk: "Sofa".to_string(),
                nama_ruangan: "Living Room".to_string(),
                quantity: 1,
                panjang: None,
                lebar: None,
                tinggi: None,
            },
            &f.actor,
            ts(2024, 1, 6),
        )
        .unwrap();
    f.orch.publish_item_pekerjaan(&id, &f.actor, ts(2024, 1, 6)).unwrap();
    f.orch.respond_rab_internal(&id, &f.actor, ts(2024, 1, 7)).unwrap();

    let err = f
        .orch
        .generate_rab_variant(&id, RabVariant::Vendor, &f.actor, ts(2024, 1, 7))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::SourceNotLocked(Tahap::RabVendor)));
    assert!(f.orch.load_order_aggregate(&id).unwrap().rab_variants.is_empty());
}

#[test]
fn test_submitted_rab_lines_are_frozen() {
    let f = Fixture::new();
    let id = f.submitted();
    let err = f
        .orch
        .set_rab_internal_lines(&id, vec![line("Meja", false, 10.0, 0.0, 0.0)], &f.actor, ts(2024, 1, 9))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::RabInternal, .. }));
}

#[test]
fn test_kontrak_needs_all_variants_and_is_unique() {
    let f = Fixture::new();
    let id = f.submitted();
    f.orch.generate_rab_variant(&id, RabVariant::Kontrak, &f.actor, ts(2024, 1, 9)).unwrap();

    let input = NewKontrak { durasi_kontrak: 30, termin_count: 2 };
    let err = f.orch.create_kontrak(&id, input, &f.actor, ts(2024, 1, 9)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::Kontrak, .. }));

    f.orch.generate_rab_variant(&id, RabVariant::Vendor, &f.actor, ts(2024, 1, 9)).unwrap();
    f.orch.generate_rab_variant(&id, RabVariant::Jasa, &f.actor, ts(2024, 1, 9)).unwrap();
    f.orch.create_kontrak(&id, input, &f.actor, ts(2024, 1, 10)).unwrap();
    let err = f.orch.create_kontrak(&id, input, &f.actor, ts(2024, 1, 11)).unwrap_err();
    assert!(matches!(err, WorkflowError::PrerequisiteNotMet { stage: Tahap::Kontrak, .. }));
}

#[test]
fn test_task_rows_follow_stages() {
    let f = Fixture::new();
    let id = f.paid();

    let tasks = TaskResponseRepository::new(f.conn.clone()).list_by_order(&id).unwrap();
    let status_of = |tahap: Tahap| tasks.iter().find(|t| t.tahap == tahap).map(|t| t.status);
    assert_eq!(status_of(Tahap::Moodboard), Some(TaskStatus::Selesai));
    assert_eq!(status_of(Tahap::Estimasi), Some(TaskStatus::Selesai));
    assert_eq!(status_of(Tahap::CommitmentFee), Some(TaskStatus::Selesai));
    assert_eq!(status_of(Tahap::DesainFinal), Some(TaskStatus::MenungguResponse));
    assert_eq!(status_of(Tahap::ItemPekerjaan), None);

    let id = f.designed();
    let tasks = TaskResponseRepository::new(f.conn.clone()).list_by_order(&id).unwrap();
    let status_of = |tahap: Tahap| tasks.iter().find(|t| t.tahap == tahap).map(|t| t.status);
    assert_eq!(status_of(Tahap::DesainFinal), Some(TaskStatus::Selesai));
    assert_eq!(status_of(Tahap::ItemPekerjaan), Some(TaskStatus::MenungguResponse));
}

#[test]
fn test_events_published_after_commit() {
    let f = Fixture::new();
    let id = f.order();
    f.orch.start_design(&id, &f.actor, ts(2024, 1, 1)).unwrap();

    let events = f.published.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event_type, StageEventType::StageOpened);
    assert_eq!(events[1].tahap, Tahap::Moodboard);
    assert_eq!(events[1].workflow_stage, Some(WorkflowStage::MoodboardPending));
}

#[test]
fn test_unknown_order_is_not_found() {
    let f = Fixture::new();
    let err = f.orch.start_design("missing", &f.actor, ts(2024, 1, 1)).unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
}
