//! Auto-run progression, pausing, and resuming
//!
//! Auto-run turns a completion reply into the next continue turn without a
//! user action; these tests script consecutive completions and watch the
//! cursor.

use super::common::*;
use jarvio::assistant::InputGate;
use jarvio_sdk::TaskStatus;

// ============================================================================
// Unattended Progression
// ============================================================================

#[tokio::test]
async fn test_three_completions_advance_three_times_without_clicks() {
    let (mut session, backend) = scripted_session(
        4,
        &[
            "SUBTASK COMPLETE",
            "SUBTASK COMPLETE",
            "SUBTASK COMPLETE",
            "All caught up.",
        ],
    );

    session.start_auto_run();
    session.send_message("go");
    pump_until(&mut session, |s| !s.is_waiting()).await;

    // One click produced four turns: the send plus three automatic continues
    assert_eq!(session.current_subtask(), 3);
    assert!(session.task.subtasks[0].done);
    assert!(session.task.subtasks[1].done);
    assert!(session.task.subtasks[2].done);
    assert!(!session.task.subtasks[3].done);

    let requests = backend.requests();
    assert_eq!(requests.len(), 4);
    for (turn, request) in requests.iter().enumerate().skip(1) {
        assert!(
            request.message.contains("continue with the next subtask"),
            "turn {} was not an automatic continue",
            turn
        );
        assert_eq!(request.current_subtask_index, turn);
    }
    assert_eq!(session.gate(), &InputGate::Ready);
}

#[tokio::test]
async fn test_completion_on_last_subtask_stops_the_run() {
    let (mut session, backend) =
        scripted_session(2, &["SUBTASK COMPLETE", "SUBTASK COMPLETE"]);

    session.start_auto_run();
    session.send_message("go");
    pump_until(&mut session, |s| !s.is_waiting()).await;

    assert_eq!(session.current_subtask(), 1);
    assert_eq!(session.task.status, TaskStatus::Done);
    assert_eq!(session.gate(), &InputGate::Ready);
    // No continue turn is issued past the last subtask
    assert_eq!(backend.requests().len(), 2);
    // The mode flag survives; there is simply nothing left to run
    assert!(session.auto_run().mode);
}

// ============================================================================
// Pause / Resume
// ============================================================================

#[tokio::test]
async fn test_pause_halts_auto_advance_until_resumed() {
    let (mut session, backend) = scripted_session(
        3,
        &["SUBTASK COMPLETE", "SUBTASK COMPLETE", "SUBTASK COMPLETE"],
    );

    session.start_auto_run();
    session.send_message("go");

    // Let the first completion land; the second turn is already in flight
    pump_until(&mut session, |s| assistant_count(s) >= 2).await;
    assert_eq!(session.current_subtask(), 1);

    session.pause_auto_run();

    // The in-flight reply still applies, but paused auto-run stops there
    pump_until(&mut session, |s| assistant_count(s) >= 3).await;
    assert!(session.task.subtasks[1].done);
    assert_eq!(session.current_subtask(), 1);
    assert_eq!(session.gate(), &InputGate::FeedbackPrompt { subtask_index: 1 });
    assert_eq!(backend.requests().len(), 2);
    // Pausing preserves the mode flag
    assert!(session.auto_run().mode);
    assert!(session.auto_run().paused);

    session.resume_auto_run();
    pump_until(&mut session, |s| !s.is_waiting()).await;

    assert_eq!(session.current_subtask(), 2);
    assert!(session.task.subtasks[2].done);
    assert_eq!(session.task.status, TaskStatus::Done);
    assert_eq!(backend.requests().len(), 3);
}

#[tokio::test]
async fn test_stop_clears_the_mode_entirely() {
    let (mut session, _backend) = scripted_session(3, &["SUBTASK COMPLETE"]);

    session.start_auto_run();
    session.stop_auto_run();
    assert!(!session.auto_run().mode);
    assert!(!session.auto_run().paused);

    // With the mode cleared, a completion falls back to the feedback prompt
    session.send_message("go");
    pump_until(&mut session, |s| !s.is_waiting()).await;
    assert_eq!(session.gate(), &InputGate::FeedbackPrompt { subtask_index: 0 });
    assert_eq!(session.current_subtask(), 0);
}

// ============================================================================
// Interaction with the Approval Gate
// ============================================================================

#[tokio::test]
async fn test_rejecting_an_approval_stops_auto_run() {
    let (mut session, backend) = scripted_session(
        3,
        &["APPROVAL NEEDED: Push the price changes", "Understood."],
    );

    session.start_auto_run();
    session.send_message("go");
    pump_until(&mut session, |s| !s.is_waiting()).await;
    assert!(session.gate().is_pending_approval());

    session.reject();
    pump_until(&mut session, |s| !s.is_waiting()).await;

    assert!(!session.auto_run().mode);
    assert_eq!(backend.requests()[1].message, "rejected");
    assert_eq!(session.current_subtask(), 0);
}

#[tokio::test]
async fn test_approval_interrupts_the_run_until_approved() {
    let (mut session, backend) = scripted_session(
        3,
        &[
            "SUBTASK COMPLETE\nAPPROVAL NEEDED: Email the supplier",
            "SUBTASK COMPLETE",
            "SUBTASK COMPLETE",
        ],
    );

    session.start_auto_run();
    session.send_message("go");
    pump_until(&mut session, |s| !s.is_waiting()).await;

    // Auto-run does not push through a pending approval
    assert!(session.gate().is_pending_approval());
    assert_eq!(backend.requests().len(), 1);
    assert_eq!(session.current_subtask(), 0);

    session.approve();
    pump_until(&mut session, |s| !s.is_waiting()).await;

    // Approval released the held advance and the run picked back up
    assert_eq!(session.current_subtask(), 2);
    assert_eq!(session.task.status, TaskStatus::Done);
    assert_eq!(backend.requests().len(), 3);
}
