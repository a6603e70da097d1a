use controller::{ActionReport, Editor};
use crossbeam_channel::{unbounded, Receiver, Sender};
use device_io::DeviceControl;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use timeline::EditAction;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("run task stopped: {0}")]
    Stopped(String),
}

/// What to do with the rest of a plan after a step fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Cancel every remaining step.
    #[default]
    Abort,
    /// Report the failure and go on with the next step.
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RunStatus {
    Pending,
    Running,
    Done(String),
    Failed(String),
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunEvent {
    pub run_id: String,
    pub step: usize,
    pub tool: String,
    pub status: RunStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepFailure {
    pub step: usize,
    pub tool: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub completed: Vec<(usize, ActionReport)>,
    pub failures: Vec<StepFailure>,
    pub canceled: bool,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty() && !self.canceled
    }
}

/// Stops a running plan. The step in flight is abandoned at its next
/// suspension point; UI state it already changed is not reverted.
#[derive(Clone)]
pub struct Canceller {
    tx: Arc<watch::Sender<bool>>,
}

impl Canceller {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

pub struct RunHandle {
    pub run_id: String,
    pub rx_events: Receiver<RunEvent>,
    canceller: Canceller,
    task: JoinHandle<RunSummary>,
}

impl RunHandle {
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    pub async fn wait(self) -> Result<RunSummary, RunError> {
        self.task
            .await
            .map_err(|e| RunError::Stopped(e.to_string()))
    }
}

/// Runs plans one step at a time against a single editor.
pub struct PlanRunner;

impl PlanRunner {
    /// Spawns the plan on the current tokio runtime.
    pub fn start<D>(editor: Arc<Editor<D>>, actions: Vec<EditAction>, policy: FailurePolicy) -> RunHandle
    where
        D: DeviceControl + 'static,
    {
        let run_id = Uuid::new_v4().to_string();
        let (tx_events, rx_events) = unbounded::<RunEvent>();
        let (tx_cancel, rx_cancel) = watch::channel(false);

        let events = Events {
            run_id: run_id.clone(),
            tx: tx_events,
        };
        for (step, action) in actions.iter().enumerate() {
            events.send(step, action, RunStatus::Pending);
        }

        let task = tokio::spawn(run_plan(editor, actions, policy, events, rx_cancel));
        RunHandle {
            run_id,
            rx_events,
            canceller: Canceller {
                tx: Arc::new(tx_cancel),
            },
            task,
        }
    }
}

struct Events {
    run_id: String,
    tx: Sender<RunEvent>,
}

impl Events {
    fn send(&self, step: usize, action: &EditAction, status: RunStatus) {
        let _ = self.tx.send(RunEvent {
            run_id: self.run_id.clone(),
            step,
            tool: action.tool_name().to_string(),
            status,
        });
    }

    fn cancel_from(&self, first: usize, actions: &[EditAction]) {
        for (step, action) in actions.iter().enumerate().skip(first) {
            self.send(step, action, RunStatus::Canceled);
        }
    }
}

/// Resolves once cancellation is requested. Never resolves if the handle is
/// dropped without canceling.
async fn canceled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn run_plan<D: DeviceControl>(
    editor: Arc<Editor<D>>,
    actions: Vec<EditAction>,
    policy: FailurePolicy,
    events: Events,
    mut rx_cancel: watch::Receiver<bool>,
) -> RunSummary {
    let mut summary = RunSummary {
        run_id: events.run_id.clone(),
        ..RunSummary::default()
    };

    for (step, action) in actions.iter().enumerate() {
        if *rx_cancel.borrow() {
            summary.canceled = true;
            events.cancel_from(step, &actions);
            break;
        }

        info!("step {}/{}: {}", step + 1, actions.len(), action);
        events.send(step, action, RunStatus::Running);

        let outcome = tokio::select! {
            result = editor.execute(action) => Some(result),
            _ = canceled(&mut rx_cancel) => None,
        };

        match outcome {
            None => {
                warn!("run {} canceled during step {}", summary.run_id, step + 1);
                summary.canceled = true;
                events.cancel_from(step, &actions);
                break;
            }
            Some(Ok(report)) => {
                events.send(step, action, RunStatus::Done(report.summary.clone()));
                summary.completed.push((step, report));
            }
            Some(Err(err)) => {
                warn!("step {} ({}) failed: {}", step + 1, action.tool_name(), err);
                events.send(step, action, RunStatus::Failed(err.to_string()));
                summary.failures.push(StepFailure {
                    step,
                    tool: action.tool_name().to_string(),
                    error: err.to_string(),
                });
                if policy == FailurePolicy::Abort {
                    events.cancel_from(step + 1, &actions);
                    break;
                }
            }
        }
    }

    info!(
        "run {} finished: {} done, {} failed{}",
        summary.run_id,
        summary.completed.len(),
        summary.failures.len(),
        if summary.canceled { ", canceled" } else { "" }
    );
    summary
}
