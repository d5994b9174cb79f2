use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::Tahap;
use crate::repository::test_support::{setup_test_db, ts};

#[test]
fn test_insert_and_find_by_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = ActionLog::new(Some("o1"), ActionType::Respond, Some(Tahap::Moodboard), "desainer", ts(2024, 1, 1))
        .with_payload(&serde_json::json!({ "moodboard_id": "mb1" }))
        .with_detail("respond moodboard");
    let id = repo.insert(&log).unwrap();
    assert_eq!(id, log.action_id);

    let found = repo.find_by_id(&id).unwrap().unwrap();
    assert_eq!(found.order_id.as_deref(), Some("o1"));
    assert_eq!(found.action_type, "Respond");
    assert_eq!(found.stage, Some(Tahap::Moodboard));
    assert_eq!(found.payload_json, Some(serde_json::json!({ "moodboard_id": "mb1" })));
    assert_eq!(found.detail.as_deref(), Some("respond moodboard"));
}

#[test]
fn test_find_by_order_in_time_order() {
    let repo = ActionLogRepository::new(setup_test_db());

    repo.insert(&ActionLog::new(Some("o1"), ActionType::StartDesign, None, "a", ts(2024, 1, 2)))
        .unwrap();
    repo.insert(&ActionLog::new(Some("o1"), ActionType::CreateOrder, Some(Tahap::Order), "a", ts(2024, 1, 1)))
        .unwrap();
    repo.insert(&ActionLog::new(None, ActionType::UpdateConfig, None, "system", ts(2024, 1, 3)))
        .unwrap();

    let logs = repo.find_by_order("o1").unwrap();
    let types: Vec<&str> = logs.iter().map(|l| l.action_type.as_str()).collect();
    assert_eq!(types, vec!["CreateOrder", "StartDesign"]);
    assert_eq!(repo.count_by_order("o1").unwrap(), 2);
    assert_eq!(repo.find_recent(1).unwrap()[0].action_type, "UpdateConfig");
}
