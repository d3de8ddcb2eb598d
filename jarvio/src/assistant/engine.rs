//! Subtask progression engine
//!
//! One `AssistantSession` per open task: the conversation history, the
//! current-subtask cursor, the input gate, and auto-run state all live here.
//! Every transition originates from a caller action or a polled driver
//! completion; there is no timer and no background worker beyond the single
//! in-flight driver task.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use jarvio_sdk::{
    log_error, markers, AssistantBackend, AssistantRequest, AssistantResponse, ChatMessage,
    EventReceiver, SessionEvent, SubtaskStatus, Task, TaskContext, TaskStatus, WorkLogEntry,
};

use crate::assistant::gate::{AutoRun, InputGate};
use crate::notifications::NotificationManager;

/// Chat text pushed when a driver call fails
const DRIVER_ERROR_REPLY: &str =
    "I apologize, but I encountered an error processing your request. Please try again.";

/// Banner text when an approval marker carries no request line
const DEFAULT_APPROVAL_REQUEST: &str = "The assistant needs your approval to continue.";

/// Implicit user turn sent when progression continues to the next subtask
const CONTINUE_MESSAGE: &str = "Please continue with the next subtask.";

/// Outcome of one background driver call
#[derive(Debug)]
pub enum DriverOutcome {
    Reply(AssistantResponse),
    Failed(String),
}

/// One simulated-results block, recorded against the subtask that produced it
#[derive(Debug, Clone)]
pub struct CollectedData {
    pub subtask_index: usize,
    pub data: String,
}

/// Conversational session working one task's subtasks in order
pub struct AssistantSession {
    /// Task being worked; subtask array order is execution order
    pub task: Task,
    /// Conversation history, oldest first
    pub messages: Vec<ChatMessage>,
    current_subtask: usize,
    gate: InputGate,
    auto_run: AutoRun,
    /// Simulated results, in arrival order
    pub collected_data: Vec<CollectedData>,
    /// Manual-step log, in arrival order
    pub work_log: Vec<WorkLogEntry>,
    pub notifications: NotificationManager,
    backend: Arc<dyn AssistantBackend>,
    /// Channel for the in-flight driver call, if any
    response_rx: Option<mpsc::UnboundedReceiver<DriverOutcome>>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl AssistantSession {
    pub fn new(task: Task, backend: Arc<dyn AssistantBackend>) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        let greeting = format!(
            "Hi! I'm Jarvio. I can help you work through \"{}\".\n\n\
             Try asking me to:\n\
             • Start the current subtask\n\
             • Collect listing, keyword, or review data\n\
             • Analyze what we've gathered\n\n\
             Enable auto-run and I'll work through the subtasks on my own.",
            task.title
        );
        Self {
            messages: vec![ChatMessage::assistant(greeting)],
            current_subtask: 0,
            gate: InputGate::Ready,
            auto_run: AutoRun::default(),
            collected_data: Vec::new(),
            work_log: Vec::new(),
            notifications: NotificationManager::new(),
            backend,
            response_rx: None,
            events_tx,
            task,
        }
    }

    pub fn current_subtask(&self) -> usize {
        self.current_subtask
    }

    pub fn gate(&self) -> &InputGate {
        &self.gate
    }

    pub fn auto_run(&self) -> AutoRun {
        self.auto_run
    }

    /// Whether a driver call is in flight
    pub fn is_waiting(&self) -> bool {
        self.gate == InputGate::AwaitingReply
    }

    /// Subscribe to this session's event stream
    pub fn events(&self) -> EventReceiver {
        self.events_tx.subscribe()
    }

    /// Send a user message through the driver
    ///
    /// Ignored while the gate has input disabled. The request snapshot
    /// carries the history as it stood before this turn; the new text rides
    /// in the request's `message` field and is appended to the visible
    /// history here.
    pub fn send_message(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.gate.accepts_input() {
            self.notifications
                .warning("Input disabled", "Resolve the pending action first");
            return;
        }

        if self.gate == InputGate::AwaitingConfirmation && markers::is_user_confirmation(text) {
            // The confirmed manual step goes straight into the work log
            let entry = WorkLogEntry::new(self.current_subtask, text.to_string());
            self.publish(SessionEvent::WorkLogRecorded {
                index: entry.subtask_index,
                entry: entry.entry.clone(),
            });
            self.work_log.push(entry);
        }

        self.dispatch(text.to_string());
    }

    /// Poll for a driver completion (non-blocking); applies at most one
    pub fn poll_response(&mut self) {
        if let Some(rx) = &mut self.response_rx {
            match rx.try_recv() {
                Ok(outcome) => {
                    self.response_rx = None;
                    match outcome {
                        DriverOutcome::Reply(response) => self.apply_reply(response),
                        DriverOutcome::Failed(error) => self.apply_failure(error),
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => {
                    // No response yet, keep waiting
                }
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.response_rx = None;
                    self.apply_failure("response channel disconnected".to_string());
                }
            }
        }
    }

    /// Approve the pending request and resume the flow
    pub fn approve(&mut self) {
        if !self.gate.is_pending_approval() {
            return;
        }
        self.publish(SessionEvent::ApprovalResolved { approved: true });
        if self
            .task
            .subtasks
            .get(self.current_subtask)
            .map(|subtask| subtask.is_resolved())
            .unwrap_or(false)
        {
            // The reply that asked for approval also completed the subtask;
            // the advance was held back until this decision
            self.advance_index();
        }
        self.dispatch("approved".to_string());
    }

    /// Reject the pending request; auto-run stops
    pub fn reject(&mut self) {
        if !self.gate.is_pending_approval() {
            return;
        }
        self.publish(SessionEvent::ApprovalResolved { approved: false });
        if self.auto_run.mode {
            self.auto_run.stop();
            self.notify_auto_run();
        }
        self.dispatch("rejected".to_string());
    }

    /// Continue past the feedback prompt without attaching feedback
    pub fn continue_to_next(&mut self) {
        if !matches!(self.gate, InputGate::FeedbackPrompt { .. }) {
            return;
        }
        self.advance_or_finish();
    }

    /// Attach feedback for the subtask that just completed, then continue
    pub fn submit_feedback(&mut self, feedback: &str) {
        let index = match &self.gate {
            InputGate::FeedbackPrompt { subtask_index } => *subtask_index,
            _ => return,
        };
        let feedback = feedback.trim();
        if feedback.is_empty() {
            self.continue_to_next();
            return;
        }
        self.publish(SessionEvent::FeedbackSubmitted {
            index,
            feedback: feedback.to_string(),
        });

        if self.current_subtask + 1 < self.task.subtasks.len() {
            self.advance_index();
            self.dispatch(format!(
                "Feedback on the subtask just completed: {}\n\n{}",
                feedback, CONTINUE_MESSAGE
            ));
        } else {
            // Last subtask: the feedback still reaches the assistant, but
            // there is nothing left to continue to
            self.gate = InputGate::Ready;
            self.dispatch(format!("Feedback on the subtask just completed: {}", feedback));
        }
    }

    /// Skip the current subtask without completing it
    pub fn skip_current(&mut self) {
        if !self.gate.accepts_input() {
            self.notifications
                .warning("Input disabled", "Resolve the pending action first");
            return;
        }
        let index = self.current_subtask;
        let title = match self.task.subtasks.get_mut(index) {
            Some(subtask) => {
                subtask.status = SubtaskStatus::Skipped;
                subtask.title.clone()
            }
            None => return,
        };
        self.publish(SessionEvent::SubtaskSkipped { index, title });
        self.finish_task_if_complete();

        if index + 1 < self.task.subtasks.len() {
            self.advance_index();
        }
        self.gate = InputGate::Ready;
    }

    /// Turn auto-run on; a pending feedback prompt is carried forward at once
    pub fn start_auto_run(&mut self) {
        self.auto_run.start();
        self.notify_auto_run();
        if matches!(self.gate, InputGate::FeedbackPrompt { .. }) {
            self.continue_to_next();
        }
    }

    /// Suspend auto-advance, keeping the mode flag for a later resume
    pub fn pause_auto_run(&mut self) {
        self.auto_run.pause();
        self.notify_auto_run();
    }

    /// Resume a paused run; a pending feedback prompt is carried forward
    pub fn resume_auto_run(&mut self) {
        self.auto_run.resume();
        self.notify_auto_run();
        if self.auto_run.is_active() && matches!(self.gate, InputGate::FeedbackPrompt { .. }) {
            self.continue_to_next();
        }
    }

    pub fn stop_auto_run(&mut self) {
        self.auto_run.stop();
        self.notify_auto_run();
    }

    /// Hand one user turn to the backend on a background task
    fn dispatch(&mut self, message: String) {
        if self.task.status == TaskStatus::NotStarted {
            self.task.status = TaskStatus::InProgress;
        }
        if let Some(subtask) = self.task.subtasks.get_mut(self.current_subtask) {
            if subtask.status == SubtaskStatus::NotStarted {
                subtask.status = SubtaskStatus::InProgress;
            }
        }

        let request = AssistantRequest {
            message: message.clone(),
            task_context: TaskContext {
                title: self.task.title.clone(),
                description: self.task.description.clone(),
                category: self.task.category.clone(),
            },
            subtasks: self.task.subtasks.clone(),
            current_subtask_index: self.current_subtask,
            conversation_history: self.messages.clone(),
        };

        self.publish(SessionEvent::MessageSent {
            text: message.clone(),
        });
        self.messages.push(ChatMessage::user(message));
        self.gate = InputGate::AwaitingReply;

        let (tx, rx) = mpsc::unbounded_channel();
        self.response_rx = Some(rx);

        let backend = self.backend.clone();
        tokio::spawn(async move {
            let outcome = match backend.respond(request).await {
                Ok(response) => DriverOutcome::Reply(response),
                Err(error) => DriverOutcome::Failed(error.to_string()),
            };
            let _ = tx.send(outcome);
        });
    }

    /// Apply one assistant reply to the session
    fn apply_reply(&mut self, response: AssistantResponse) {
        let index = self.current_subtask;
        self.publish(SessionEvent::ReplyReceived {
            subtask_index: index,
            subtask_complete: response.subtask_complete,
            approval_needed: response.approval_needed,
        });

        if let Some(data) = &response.collected_data {
            self.collected_data.push(CollectedData {
                subtask_index: index,
                data: data.clone(),
            });
            self.publish(SessionEvent::DataCollected {
                index,
                data: data.clone(),
            });
        }
        if let Some(entry) = &response.user_work_log {
            self.work_log.push(WorkLogEntry::new(index, entry.clone()));
            self.publish(SessionEvent::WorkLogRecorded {
                index,
                entry: entry.clone(),
            });
        }

        // The approval request text only travels inside the raw reply
        let approval_request = markers::parse_assistant_reply(&response.reply)
            .approval_request
            .unwrap_or_else(|| DEFAULT_APPROVAL_REQUEST.to_string());

        let completed = response.subtask_complete && self.complete_current();

        self.messages
            .push(ChatMessage::assistant(response.reply.clone()));

        if response.approval_needed {
            // Completion above still counts; the advance waits for the decision
            self.publish(SessionEvent::ApprovalRequested {
                request: approval_request.clone(),
            });
            self.gate = InputGate::PendingApproval {
                request: approval_request,
            };
        } else if completed {
            if self.auto_run.is_active() {
                self.advance_or_finish();
            } else {
                self.gate = InputGate::FeedbackPrompt {
                    subtask_index: index,
                };
            }
        } else if markers::awaiting_confirmation(&response.reply) {
            self.gate = InputGate::AwaitingConfirmation;
        } else {
            self.gate = InputGate::Ready;
        }
    }

    /// Driver failure: apology bubble plus a notification; the cursor stays
    /// put and auto-run is left as it was
    fn apply_failure(&mut self, error: String) {
        log_error!("Assistant request failed: {}", error);
        self.publish(SessionEvent::DriverFailed {
            error: error.clone(),
        });
        self.messages
            .push(ChatMessage::assistant(DRIVER_ERROR_REPLY.to_string()));
        self.notifications.error("Assistant request failed", error);
        self.gate = InputGate::Ready;
    }

    /// Mark the current subtask done; false when there is nothing to mark
    fn complete_current(&mut self) -> bool {
        let index = self.current_subtask;
        let title = match self.task.subtasks.get_mut(index) {
            Some(subtask) => {
                subtask.done = true;
                subtask.status = SubtaskStatus::Done;
                subtask.title.clone()
            }
            None => return false,
        };
        self.publish(SessionEvent::SubtaskCompleted { index, title });
        self.finish_task_if_complete();
        true
    }

    fn finish_task_if_complete(&mut self) {
        if self.task.status != TaskStatus::Done && self.task.is_complete() {
            self.task.status = TaskStatus::Done;
            self.publish(SessionEvent::TaskCompleted {
                title: self.task.title.clone(),
            });
            self.notifications
                .success("Task complete", self.task.title.clone());
        }
    }

    /// Either continue with the next subtask or come to rest after the last
    fn advance_or_finish(&mut self) {
        if self.current_subtask + 1 < self.task.subtasks.len() {
            self.advance_index();
            self.dispatch(CONTINUE_MESSAGE.to_string());
        } else {
            self.gate = InputGate::Ready;
        }
    }

    /// Move the cursor forward one subtask, clamped to the last index
    fn advance_index(&mut self) {
        let last = self.task.subtasks.len().saturating_sub(1);
        self.current_subtask = (self.current_subtask + 1).min(last);
        if let Some(subtask) = self.task.subtasks.get_mut(self.current_subtask) {
            if subtask.status == SubtaskStatus::NotStarted {
                subtask.status = SubtaskStatus::InProgress;
            }
        }
    }

    /// Emit an event to stderr and any in-process subscribers
    fn publish(&self, event: SessionEvent) {
        event.emit();
        let _ = self.events_tx.send(event);
    }

    fn notify_auto_run(&self) {
        self.publish(SessionEvent::AutoRunChanged {
            mode: self.auto_run.mode,
            paused: self.auto_run.paused,
        });
    }
}
