//! Scheduler-level tests driving [`GestureTracker`] with scripted collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use approx::assert_abs_diff_eq;
use mudra::gesture::{thumbs_up, victory, GestureSet, RecognitionResult};
use mudra::landmark::{HandPrediction, Landmarks, NUM_LANDMARKS};
use mudra::tracker::{FrameSource, GestureTracker, LandmarkProvider, RecognitionSink, SharedSlot};

/// Landmarks of a hand doing a thumbs-up: thumb straight up, other fingers folded.
fn thumbs_up_positions() -> Vec<[f32; 3]> {
    let mut positions = vec![[0.0f32; 3]; NUM_LANDMARKS];
    positions[0] = [100.0, 200.0, 0.0];
    for i in 0..4 {
        positions[1 + i] = [92.0, 186.0 - 14.0 * i as f32, 0.0];
    }
    for f in 0..4 {
        let base = 5 + 4 * f;
        let x = 108.0 + 12.0 * f as f32;
        positions[base] = [x, 168.0, 0.0];
        positions[base + 1] = [x, 152.0, 0.0];
        positions[base + 2] = [x, 162.0, 4.0];
        positions[base + 3] = [x, 172.0, 6.0];
    }
    positions
}

fn thumbs_up_prediction() -> HandPrediction {
    HandPrediction::from_slice(&thumbs_up_positions(), 0.95).unwrap()
}

fn gestures() -> Arc<GestureSet> {
    Arc::new(GestureSet::new(vec![thumbs_up(), victory()]))
}

/// A frame source handing out numbered frames as fast as they are pulled.
struct Ticker {
    next: u64,
    supply: bool,
    ready: Arc<AtomicBool>,
}

impl Ticker {
    fn new() -> Self {
        Self {
            next: 0,
            supply: true,
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A source that is ready but never has a frame available.
    fn empty() -> Self {
        Self {
            supply: false,
            ..Self::new()
        }
    }
}

impl FrameSource for Ticker {
    type Frame = u64;

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn try_next_frame(&mut self) -> Option<u64> {
        if !self.supply {
            return None;
        }
        let frame = self.next;
        self.next += 1;
        Some(frame)
    }
}

/// A landmark provider whose responses come from a closure, counting every call.
struct Scripted<F> {
    respond: F,
    calls: Arc<AtomicUsize>,
    ready: Arc<AtomicBool>,
}

impl<F> Scripted<F>
where
    F: FnMut(u64) -> Result<Vec<HandPrediction>> + Send + 'static,
{
    fn new(respond: F) -> Self {
        Self {
            respond,
            calls: Arc::new(AtomicUsize::new(0)),
            ready: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl<F> LandmarkProvider for Scripted<F>
where
    F: FnMut(u64) -> Result<Vec<HandPrediction>> + Send + 'static,
{
    type Frame = u64;

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn estimate(&mut self, frame: u64) -> Result<Vec<HandPrediction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(frame)
    }
}

/// A sink recording every published result.
#[derive(Clone, Default)]
struct Recorder {
    results: Arc<Mutex<Vec<RecognitionResult>>>,
}

impl Recorder {
    fn all(&self) -> Vec<RecognitionResult> {
        self.results.lock().unwrap().clone()
    }

    fn count(&self) -> usize {
        self.results.lock().unwrap().len()
    }
}

impl RecognitionSink for Recorder {
    fn publish(&mut self, result: RecognitionResult) {
        self.results.lock().unwrap().push(result);
    }
}

fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn recognizes_thumbs_up_end_to_end() {
    let slot = SharedSlot::new();
    let provider = Scripted::new(|_| Ok(vec![thumbs_up_prediction()]));
    let mut tracker = GestureTracker::new(Ticker::new(), provider, gestures(), slot.clone());
    tracker.start().unwrap();

    wait_until("a recognized gesture", || slot.latest().is_recognized());
    tracker.stop();

    let result = slot.latest();
    let score = result.recognized().unwrap();
    assert_eq!(score.name(), "thumbs_up");
    assert!(score.confidence() >= 7.5);
    assert_abs_diff_eq!(score.confidence(), 10.0, epsilon = 1e-4);
}

#[test]
fn at_most_one_estimation_in_flight() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let (current, max) = (in_flight.clone(), max_in_flight.clone());
    let provider = Scripted::new(move |_| {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(2));
        current.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![thumbs_up_prediction()])
    });
    let calls = provider.calls.clone();

    let mut tracker = GestureTracker::new(Ticker::new(), provider, gestures(), Recorder::default());
    tracker.start().unwrap();
    wait_until("10 estimation calls", || calls.load(Ordering::SeqCst) >= 10);
    tracker.stop();

    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

#[test]
fn stop_discards_the_in_flight_result() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let provider = Scripted::new(move |_| {
        started_tx.send(()).unwrap();
        release_rx.recv().ok();
        Ok(vec![thumbs_up_prediction()])
    });
    let calls = provider.calls.clone();
    let recorder = Recorder::default();

    let mut tracker =
        GestureTracker::new(Ticker::new(), provider, gestures(), recorder.clone());
    tracker.start().unwrap();
    started_rx.recv().unwrap();

    // Resolve the outstanding estimation only once stop() is already waiting on it.
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        release_tx.send(()).ok();
    });
    tracker.stop();
    releaser.join().unwrap();

    assert_eq!(recorder.count(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_and_failed_estimations_publish_none_and_recover() {
    let provider = Scripted::new(|frame| {
        if frame % 2 == 0 {
            bail!("inference backend unavailable");
        }
        Ok(Vec::new())
    });
    let calls = provider.calls.clone();
    let recorder = Recorder::default();

    let mut tracker =
        GestureTracker::new(Ticker::new(), provider, gestures(), recorder.clone());
    tracker.start().unwrap();
    wait_until("4 estimation calls", || calls.load(Ordering::SeqCst) >= 4);
    tracker.stop();

    let results = recorder.all();
    assert!(!results.is_empty());
    assert!(results.iter().all(|result| *result == RecognitionResult::none()));
}

#[test]
fn degenerate_predictions_publish_none() {
    // A buggy provider can hand over non-finite coordinates; the extractor skips such hands.
    let provider = Scripted::new(|_| {
        let positions = [[f32::NAN; 3]; NUM_LANDMARKS];
        Ok(vec![HandPrediction::new(
            Landmarks::from_positions(positions),
            0.9,
        )])
    });
    let recorder = Recorder::default();

    let mut tracker =
        GestureTracker::new(Ticker::new(), provider, gestures(), recorder.clone());
    tracker.start().unwrap();
    wait_until("a published result", || recorder.count() >= 2);
    tracker.stop();

    assert!(recorder
        .all()
        .iter()
        .all(|result| *result == RecognitionResult::none()));
}

#[test]
fn no_frames_means_no_estimation() {
    let provider = Scripted::new(|_| Ok(vec![thumbs_up_prediction()]));
    let calls = provider.calls.clone();
    let recorder = Recorder::default();

    let mut tracker =
        GestureTracker::new(Ticker::empty(), provider, gestures(), recorder.clone());
    tracker.start().unwrap();
    thread::sleep(Duration::from_millis(50));
    tracker.stop();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.count(), 0);
}

#[test]
fn start_requires_ready_collaborators() {
    let provider = Scripted::new(|_| Ok(Vec::new()));
    provider.ready.store(false, Ordering::SeqCst);
    let provider_ready = provider.ready.clone();
    let mut tracker = GestureTracker::new(Ticker::new(), provider, gestures(), Recorder::default());
    assert!(tracker.start().is_err());
    assert!(!tracker.is_running());

    // Readiness can be reached later; a failed start() does not poison the tracker.
    provider_ready.store(true, Ordering::SeqCst);
    tracker.start().unwrap();
    assert!(tracker.is_running());
    tracker.stop();

    let source = Ticker::new();
    source.ready.store(false, Ordering::SeqCst);
    let provider = Scripted::new(|_| Ok(Vec::new()));
    let mut tracker = GestureTracker::new(source, provider, gestures(), Recorder::default());
    assert!(tracker.start().is_err());
    assert!(!tracker.is_running());
}

#[test]
fn start_and_stop_are_idempotent() {
    let provider = Scripted::new(|_| Ok(Vec::new()));
    let mut tracker = GestureTracker::new(Ticker::new(), provider, gestures(), Recorder::default());

    tracker.start().unwrap();
    tracker.start().unwrap();
    assert!(tracker.is_running());

    tracker.stop();
    tracker.stop();
    assert!(!tracker.is_running());

    // A stopped tracker cannot be revived.
    assert!(tracker.start().is_err());
}
