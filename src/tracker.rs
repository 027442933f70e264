//! The recognition loop: frame acquisition, landmark estimation, gesture publishing.
//!
//! [`GestureTracker`] drives a self-rescheduling loop on its own thread: pull a frame, ship it to
//! the landmark estimation worker, classify the resulting landmarks, publish a
//! [`RecognitionResult`], repeat. The next estimation is only issued once the previous one has
//! resolved, so at most one inference is in flight at any time; frames arriving in between are
//! simply never pulled and get overwritten at the source ("backpressure by dropping").
//!
//! The three collaborators the loop talks to are host-supplied: a [`FrameSource`], a
//! [`LandmarkProvider`] and a [`RecognitionSink`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{bail, ensure, Result};
use pawawwewism::{promise, Promise, Worker};

use crate::finger;
use crate::gesture::{GestureSet, RecognitionResult};
use crate::landmark::HandPrediction;
use crate::num::TotalF32;

/// A non-blocking supplier of camera frames.
///
/// The frame type is opaque to this crate; resolution and pixel format are negotiated between the
/// source and the [`LandmarkProvider`] by the host.
pub trait FrameSource: Send + 'static {
    type Frame: Send + 'static;

    /// Returns whether the source is ready to produce frames.
    fn is_ready(&self) -> bool {
        true
    }

    /// Pulls the most recent frame, or [`None`] when no new frame is available yet.
    ///
    /// Must not block. The source is expected to overwrite older frames so that a slow consumer
    /// only ever sees the freshest one.
    fn try_next_frame(&mut self) -> Option<Self::Frame>;
}

/// An asynchronous hand landmark estimation service (typically a neural network).
pub trait LandmarkProvider: Send + 'static {
    type Frame: Send + 'static;

    /// Returns whether the provider has finished initializing.
    fn is_ready(&self) -> bool {
        true
    }

    /// Estimates hand landmarks in `frame`.
    ///
    /// Returns zero or more predictions. An empty list and an error are treated uniformly by the
    /// caller as "no recognizable gesture this cycle"; errors are additionally logged.
    fn estimate(&mut self, frame: Self::Frame) -> Result<Vec<HandPrediction>>;
}

/// Consumer of recognition results, called once per completed recognition cycle.
pub trait RecognitionSink: Send + 'static {
    /// Receives the latest [`RecognitionResult`], replacing whatever was published before.
    fn publish(&mut self, result: RecognitionResult);
}

/// A cloneable last-writer-wins slot holding the most recent [`RecognitionResult`].
///
/// One clone goes to the [`GestureTracker`] as its sink, the others are polled by presentation
/// code via [`SharedSlot::latest`]. The slot never queues: readers only ever observe the newest
/// published result.
#[derive(Debug, Clone, Default)]
pub struct SharedSlot {
    inner: Arc<Mutex<RecognitionResult>>,
}

impl SharedSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the most recently published result.
    pub fn latest(&self) -> RecognitionResult {
        self.inner.lock().unwrap().clone()
    }
}

impl RecognitionSink for SharedSlot {
    fn publish(&mut self, result: RecognitionResult) {
        *self.inner.lock().unwrap() = result;
    }
}

struct Parts<S, P, K> {
    source: S,
    provider: P,
    sink: K,
}

/// Drives the continuous gesture recognition loop for one hand-tracking session.
///
/// Estimation runs on a dedicated worker thread; the scheduler thread blocks on its promise
/// before pulling the next frame, which is what enforces the single-in-flight invariant. All
/// [`RecognitionResult`] updates are therefore totally ordered by completion order, which equals
/// issue order.
///
/// Dropping the tracker stops it.
pub struct GestureTracker<S, P, K>
where
    S: FrameSource,
    P: LandmarkProvider<Frame = S::Frame>,
    K: RecognitionSink,
{
    parts: Option<Parts<S, P, K>>,
    gestures: Arc<GestureSet>,
    alive: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl<S, P, K> GestureTracker<S, P, K>
where
    S: FrameSource,
    P: LandmarkProvider<Frame = S::Frame>,
    K: RecognitionSink,
{
    /// Creates a tracker that will recognize the gestures in `gestures`.
    ///
    /// Nothing runs until [`GestureTracker::start`] is called.
    pub fn new(source: S, provider: P, gestures: Arc<GestureSet>, sink: K) -> Self {
        Self {
            parts: Some(Parts {
                source,
                provider,
                sink,
            }),
            gestures,
            alive: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Starts the recognition loop.
    ///
    /// Fails when the frame source or the landmark provider report themselves not ready; the
    /// tracker then never transitions to running. Calling `start` on an already running tracker
    /// is a no-op. A tracker that was stopped cannot be started again; create a new one.
    pub fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            log::debug!("start() called on a running tracker");
            return Ok(());
        }
        let Some(parts) = &self.parts else {
            bail!("tracker was already stopped");
        };
        ensure!(parts.provider.is_ready(), "landmark provider is not ready");
        ensure!(parts.source.is_ready(), "frame source is not ready");

        let Parts {
            mut source,
            mut provider,
            mut sink,
        } = self.parts.take().unwrap();

        let mut estimator = Worker::builder().name("landmark estimator").spawn(
            move |(frame, result): (S::Frame, Promise<Result<Vec<HandPrediction>>>)| {
                result.fulfill(provider.estimate(frame));
            },
        )?;

        self.alive.store(true, Ordering::Release);
        let alive = self.alive.clone();
        let gestures = self.gestures.clone();
        let thread = thread::Builder::new()
            .name("gesture scheduler".into())
            .spawn(move || {
                let mut stats = LoopStats::new();
                while alive.load(Ordering::Acquire) {
                    let Some(frame) = source.try_next_frame() else {
                        // No new frame yet; retry right away without touching the estimator.
                        thread::yield_now();
                        continue;
                    };

                    let (result, result_handle) = promise();
                    estimator.send((frame, result));
                    let outcome = result_handle.block();

                    // A stop() that raced the estimation discards the result unpublished.
                    if !alive.load(Ordering::Acquire) {
                        break;
                    }

                    let result = match outcome {
                        Ok(Ok(predictions)) => recognize(&gestures, &predictions),
                        Ok(Err(e)) => {
                            log::warn!("landmark estimation failed: {e:#}");
                            RecognitionResult::none()
                        }
                        Err(_) => {
                            // The estimator died mid-call; dropping it below propagates its panic.
                            log::error!("landmark estimator exited without a result");
                            break;
                        }
                    };

                    sink.publish(result);
                    stats.tick();
                }
            })?;
        self.thread = Some(thread);
        Ok(())
    }

    /// Returns whether the tracker has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Stops the recognition loop.
    ///
    /// Waits for an in-flight estimation to resolve, but its result is discarded and no further
    /// estimation is issued once `stop` returns. Idempotent.
    pub fn stop(&mut self) {
        self.alive.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("gesture scheduler thread panicked");
            }
        }
    }
}

impl<S, P, K> Drop for GestureTracker<S, P, K>
where
    S: FrameSource,
    P: LandmarkProvider<Frame = S::Frame>,
    K: RecognitionSink,
{
    fn drop(&mut self) {
        self.stop();
    }
}

/// Reduces one estimation outcome to the result to publish.
fn recognize(gestures: &GestureSet, predictions: &[HandPrediction]) -> RecognitionResult {
    // Multi-hand frames recognize only the most confidently detected hand.
    let Some(hand) = predictions
        .iter()
        .max_by_key(|prediction| TotalF32(prediction.confidence()))
    else {
        return RecognitionResult::none();
    };

    match finger::classify(hand.landmarks()) {
        Some(fingers) => gestures.recognize(&fingers),
        None => {
            log::debug!("skipping degenerate hand prediction");
            RecognitionResult::none()
        }
    }
}

/// Logs the recognition rate once per second.
struct LoopStats {
    cycles: u32,
    since: Instant,
}

impl LoopStats {
    fn new() -> Self {
        Self {
            cycles: 0,
            since: Instant::now(),
        }
    }

    fn tick(&mut self) {
        self.cycles += 1;
        if self.since.elapsed() > Duration::from_secs(1) {
            log::debug!("gesture loop: {} cycles/s", self.cycles);
            self.cycles = 0;
            self.since = Instant::now();
        }
    }
}
