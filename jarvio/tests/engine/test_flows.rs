//! Flow templates, task instantiation, and the store
//!
//! Covers the conversion contract (ordered blocks and step titles survive a
//! flow -> task -> accessor round trip), the generator fallback contract, and
//! flow/task persistence through a real on-disk database.

use super::common::*;
use jarvio::flowgen::fallback_flow;
use jarvio::store::Database;
use jarvio_sdk::{BlockKind, FlowDraft, SubtaskStatus, GENERATOR_KINDS};

// ============================================================================
// Conversion Round Trips
// ============================================================================

#[test]
fn test_flow_to_task_round_trip_preserves_order() {
    let flow = sample_flow();
    let expected_blocks = flow.blocks.clone();
    let expected_titles: Vec<String> = flow.steps.iter().map(|s| s.title.clone()).collect();

    let task = flow.into_task();
    let stored = task.flow().expect("template embedded in task");

    assert_eq!(stored.blocks, expected_blocks);
    let titles: Vec<String> = task.subtasks.iter().map(|s| s.title.clone()).collect();
    assert_eq!(titles, expected_titles);

    // Step -> block links resolve by index, in order
    let kinds: Vec<BlockKind> = task
        .subtasks
        .iter()
        .filter_map(|s| s.block.as_ref().map(|b| b.kind))
        .collect();
    assert_eq!(kinds, [BlockKind::Collect, BlockKind::Think, BlockKind::Act]);
}

#[test]
fn test_generated_draft_instantiates_one_subtask_per_block() {
    let draft = FlowDraft {
        name: "Review sweep".to_string(),
        description: "Work through recent reviews".to_string(),
        blocks: vec![
            jarvio_sdk::FlowBlock::new(
                BlockKind::Collect,
                "Review Information".to_string(),
                "Pull reviews".to_string(),
            ),
            jarvio_sdk::FlowBlock::new(
                BlockKind::Think,
                "Review Analysis".to_string(),
                "Find complaints".to_string(),
            ),
        ],
    };
    assert!(draft.validate().is_ok());

    let task = draft.into_flow().into_task();
    assert_eq!(task.subtasks.len(), 2);
    assert_eq!(task.subtasks[0].title, "Pull reviews");
    assert_eq!(
        task.subtasks[1].block.as_ref().map(|b| b.option.as_str()),
        Some("Review Analysis")
    );
}

// ============================================================================
// Fallback Contract
// ============================================================================

#[test]
fn test_fallback_flow_always_satisfies_the_generation_contract() {
    for prompt in [
        "help me restock best sellers",
        "",
        "  ",
        "a very long prompt that goes on and on about everything the seller wants done today",
    ] {
        let draft = fallback_flow(prompt);
        assert!(draft.validate().is_ok(), "prompt {:?}", prompt);
        assert!(!draft.name.trim().is_empty());
        assert!(!draft.description.trim().is_empty());
        assert!(!draft.blocks.is_empty());
        for block in &draft.blocks {
            assert!(GENERATOR_KINDS.contains(&block.kind));
            assert!(block.kind.allows(&block.option));
        }
    }
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_flow_survives_the_store_and_instantiates_later() {
    let temp_dir = create_temp_dir("flow_store");
    let db = Database::new(temp_dir.join("jarvio.db")).unwrap();
    db.initialize_schema().unwrap();

    let flow = sample_flow();
    db.save_flow(&flow).unwrap();

    let loaded = db.get_flow(&flow.id).unwrap().unwrap();
    assert_eq!(loaded, flow);

    // A stored template instantiates the same ordered task later
    let mut task = loaded.into_task();
    db.save_task(&mut task).unwrap();

    let read_back = db.get_task(&task.id).unwrap().unwrap();
    assert_eq!(read_back.flow(), Some(&flow));
    let titles: Vec<&str> = read_back.subtasks.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(
        titles,
        ["Gather listing data", "Identify best sellers", "Submit restock order"]
    );

    cleanup_temp_dir(&temp_dir);
}

#[test]
fn test_subtask_progress_survives_a_restart() {
    let temp_dir = create_temp_dir("progress_restart");
    let db_path = temp_dir.join("jarvio.db");

    let task_id = {
        let db = Database::new(db_path.clone()).unwrap();
        db.initialize_schema().unwrap();

        let mut task = sample_task(3);
        task.subtasks[0].done = true;
        task.subtasks[0].status = SubtaskStatus::Done;
        task.subtasks[1].status = SubtaskStatus::Skipped;
        db.save_task(&mut task).unwrap();
        task.id
    };

    // Reopen the same file, as a restarted server would
    let db = Database::new(db_path).unwrap();
    db.initialize_schema().unwrap();

    let task = db.get_task(&task_id).unwrap().unwrap();
    assert!(task.subtasks[0].done);
    assert_eq!(task.subtasks[1].status, SubtaskStatus::Skipped);
    assert_eq!(task.progress(), (2, 3));

    cleanup_temp_dir(&temp_dir);
}
