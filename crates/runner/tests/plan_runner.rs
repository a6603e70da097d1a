use async_trait::async_trait;
use controller::{ids, Catalog, ControlConfig, Editor, SessionContext};
use device_io::{Bounds, DeviceControl, DeviceError, Snapshot, UiElement};
use runner::{FailurePolicy, PlanRunner, RunEvent, RunStatus};
use session::MemoryStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use timeline::EditAction;
use tokio::sync::Notify;

/// A frozen duration dialog over a calibrated scrubber. While `hold` is set,
/// snapshots never return.
#[derive(Default)]
struct StillDevice {
    hold: AtomicBool,
    gate: Notify,
}

fn element(index: usize, id: &str, text: &str, bounds: Bounds) -> UiElement {
    UiElement {
        index,
        resource_id: id.to_string(),
        text: text.to_string(),
        bounds,
    }
}

#[async_trait]
impl DeviceControl for StillDevice {
    async fn snapshot(&self) -> Result<Snapshot, DeviceError> {
        if self.hold.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        let mut out = Vec::new();
        let mut left = 300;
        for width in [240, 150, 150, 200] {
            out.push(element(
                out.len(),
                ids::SCRUBBER_SEGMENT,
                "",
                Bounds::new(left, 1200, left + width, 1320),
            ));
            left += width;
        }
        out.push(element(out.len(), ids::CURRENT_POSITION, "0:00.0", Bounds::default()));
        out.push(element(
            out.len(),
            ids::TOOLBAR_TITLE,
            "CANVAS",
            Bounds::new(0, 2160, 200, 2240),
        ));
        out.push(element(
            out.len(),
            ids::TOOLBAR_TITLE,
            "Duration",
            Bounds::new(200, 2160, 400, 2240),
        ));
        for id in [ids::BTN_EDIT_DURATION, ids::EDIT_TEXT, ids::BTN_OK, ids::BTN_APPLY] {
            out.push(element(out.len(), id, "", Bounds::new(100, 1400, 200, 1480)));
        }
        Ok(out)
    }

    async fn tap_by_index(&self, _index: usize) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn tap_at(&self, _x: i32, _y: i32) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn swipe(&self, _from: (i32, i32), _to: (i32, i32), _ms: u64) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn input_text(&self, _text: &str, _index: usize) -> Result<(), DeviceError> {
        Ok(())
    }
}

async fn calibrated(clips: usize) -> (Arc<StillDevice>, Arc<Editor<Arc<StillDevice>>>) {
    let device = Arc::new(StillDevice::default());
    let editor = Editor::new(
        device.clone(),
        SessionContext::open(Box::new(MemoryStore::new())).unwrap(),
        Arc::new(Catalog::builtin()),
        ControlConfig::simulated(),
    );
    editor.calibrate(clips).await.unwrap();
    (device, Arc::new(editor))
}

fn duration(clip: usize, new_duration: f64) -> EditAction {
    EditAction::DurationChange { clip, new_duration }
}

fn statuses(events: &[RunEvent], step: usize) -> Vec<RunStatus> {
    events
        .iter()
        .filter(|e| e.step == step)
        .map(|e| e.status.clone())
        .collect()
}

#[tokio::test]
async fn test_plan_runs_in_order() {
    let (_device, editor) = calibrated(3).await;
    let handle = PlanRunner::start(
        editor.clone(),
        vec![duration(1, 3.0), duration(2, 4.0)],
        FailurePolicy::Abort,
    );
    let rx = handle.rx_events.clone();
    let summary = handle.wait().await.unwrap();

    assert!(summary.succeeded());
    assert_eq!(summary.completed.len(), 2);
    assert_eq!(editor.timeline().await.unwrap().durations(), &[3.0, 4.0, 5.0]);

    let events: Vec<RunEvent> = rx.try_iter().collect();
    let first = statuses(&events, 0);
    assert_eq!(first.len(), 3);
    assert_eq!(first[0], RunStatus::Pending);
    assert_eq!(first[1], RunStatus::Running);
    assert!(matches!(first[2], RunStatus::Done(_)));
    assert!(events.iter().all(|e| e.tool == "change_duration"));
    assert!(events.iter().all(|e| e.run_id == summary.run_id));
}

#[tokio::test]
async fn test_abort_cancels_remaining_steps() {
    let (_device, editor) = calibrated(3).await;
    let handle = PlanRunner::start(
        editor.clone(),
        vec![duration(5, 3.0), duration(1, 2.0)],
        FailurePolicy::Abort,
    );
    let rx = handle.rx_events.clone();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].step, 0);
    assert!(summary.completed.is_empty());
    assert!(!summary.canceled);

    let events: Vec<RunEvent> = rx.try_iter().collect();
    assert_eq!(
        statuses(&events, 1),
        vec![RunStatus::Pending, RunStatus::Canceled]
    );
    assert_eq!(editor.timeline().await.unwrap().durations(), &[5.0, 5.0, 5.0]);
}

#[tokio::test]
async fn test_continue_policy_runs_past_failures() {
    let (_device, editor) = calibrated(3).await;
    let handle = PlanRunner::start(
        editor.clone(),
        vec![duration(5, 3.0), duration(1, 2.0)],
        FailurePolicy::Continue,
    );
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.completed.len(), 1);
    assert_eq!(summary.completed[0].0, 1);
    assert!(!summary.succeeded());
    assert_eq!(editor.timeline().await.unwrap().durations(), &[2.0, 5.0, 5.0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_abandons_step_in_flight() {
    let (device, editor) = calibrated(3).await;
    device.hold.store(true, Ordering::SeqCst);

    let handle = PlanRunner::start(
        editor.clone(),
        vec![duration(1, 3.0), duration(2, 3.0)],
        FailurePolicy::Abort,
    );
    let rx = handle.rx_events.clone();

    // wait until the first step is stuck on the device
    let started = tokio::task::spawn_blocking(move || loop {
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(event) if event.status == RunStatus::Running => break rx,
            Ok(_) => continue,
            Err(e) => panic!("no running event: {e}"),
        }
    })
    .await
    .unwrap();

    handle.cancel();
    let summary = handle.wait().await.unwrap();
    assert!(summary.canceled);
    assert!(summary.completed.is_empty());

    let rest: Vec<RunEvent> = started.try_iter().collect();
    assert_eq!(
        rest.iter().map(|e| (e.step, e.status.clone())).collect::<Vec<_>>(),
        vec![(0, RunStatus::Canceled), (1, RunStatus::Canceled)]
    );
    // nothing was committed
    assert_eq!(editor.timeline().await.unwrap().durations(), &[5.0, 5.0, 5.0]);
}
