//! Concurrent calibration runs.
//!
//! A [`CalibrationRun`] spawns one scoped thread per [`CalibrationTask`].
//! Each task reads its capture pair through a [`SignalSource`], extracts
//! transfer samples, and appends them to the run's [`CoilAccumulator`].
//! Failures are collected rather than propagated, so every task runs to
//! completion; after the join the first recorded failure fails the run.
//!
//! ```text
//! Idle ──execute──▶ Running ──all ok──▶ Completed
//!                          └─any error─▶ Failed
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;

use crate::aggregate::{CalibrationCurve, CoilAccumulator, aggregate};
use crate::error::{Error, Result};
use crate::spectral::{SpectralCalibrator, TransferSample, Waveform};

/// Supplies sample data for capture paths.
pub trait SignalSource: Sync {
    /// Read the capture stored at `path`.
    fn read(&self, path: &Path) -> Result<Vec<f64>>;
}

/// Receives progress percentages (0 to 100).
///
/// Implementations are called from worker threads while the run's progress
/// counter is held, so they must not block.
pub trait ProgressSink: Sync {
    /// Report overall completion.
    fn report(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Sync,
{
    fn report(&self, percent: u8) {
        self(percent);
    }
}

/// Progress sink backed by a bounded channel.
///
/// Updates that do not fit are dropped; later updates supersede them anyway.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: Sender<u8>,
}

impl ChannelProgress {
    /// Create a sink and the receiver that drains it.
    pub fn bounded(capacity: usize) -> (Self, Receiver<u8>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, percent: u8) {
        let _ = self.tx.try_send(percent);
    }
}

/// In-memory captures keyed by path.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    captures: HashMap<PathBuf, Vec<f64>>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capture under `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, samples: Vec<f64>) {
        self.captures.insert(path.into(), samples);
    }

    /// Builder form of [`MemorySource::insert`].
    pub fn with(mut self, path: impl Into<PathBuf>, samples: Vec<f64>) -> Self {
        self.insert(path, samples);
        self
    }
}

impl SignalSource for MemorySource {
    fn read(&self, path: &Path) -> Result<Vec<f64>> {
        self.captures.get(path).cloned().ok_or_else(|| {
            Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no capture registered"),
            )
        })
    }
}

/// One calibration unit: a capture pair for a coil at one stimulus setting.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTask {
    /// Coil under test.
    pub coil: String,
    /// Nominal stimulus frequency (Hz).
    pub frequency: f64,
    /// Stimulus waveform.
    pub waveform: Waveform,
    /// Transmit (reference) capture.
    pub tx: PathBuf,
    /// Receive (coil output) capture.
    pub rx: PathBuf,
}

impl CalibrationTask {
    /// Create a task.
    pub fn new(
        coil: impl Into<String>,
        frequency: f64,
        waveform: Waveform,
        tx: impl Into<PathBuf>,
        rx: impl Into<PathBuf>,
    ) -> Self {
        Self {
            coil: coil.into(),
            frequency,
            waveform,
            tx: tx.into(),
            rx: rx.into(),
        }
    }

    fn wrap(&self, source: Error) -> Error {
        Error::Task {
            coil: self.coil.clone(),
            waveform: self.waveform,
            frequency: self.frequency,
            source: Box::new(source),
        }
    }

    fn key(&self) -> (String, Waveform, u64) {
        (self.coil.clone(), self.waveform, self.frequency.to_bits())
    }
}

/// The set of tasks for one run.
///
/// Entries with the same coil, waveform and frequency collapse into one; the
/// last entry's capture paths win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationRequest {
    tasks: Vec<CalibrationTask>,
}

impl CalibrationRequest {
    /// Build a request from tasks.
    pub fn new(tasks: impl IntoIterator<Item = CalibrationTask>) -> Self {
        let mut request = Self::default();
        for task in tasks {
            request.push(task);
        }
        request
    }

    /// Add a task, replacing any earlier task for the same unit.
    pub fn push(&mut self, task: CalibrationTask) {
        let key = task.key();
        if let Some(existing) = self.tasks.iter_mut().find(|t| t.key() == key) {
            *existing = task;
        } else {
            self.tasks.push(task);
        }
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> &[CalibrationTask] {
        &self.tasks
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Lifecycle of a [`CalibrationRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Created, not yet executed.
    Idle,
    /// Tasks are in flight.
    Running,
    /// All tasks succeeded and curves were produced.
    Completed,
    /// A task or the aggregation failed.
    Failed,
}

impl RunState {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completed-task counter that emits `round(100 * done / total)`.
struct ProgressCounter<'a, P: ?Sized> {
    done: Mutex<usize>,
    total: usize,
    sink: &'a P,
}

impl<P: ProgressSink + ?Sized> ProgressCounter<'_, P> {
    fn complete_one(&self) {
        let mut done = self.done.lock();
        *done += 1;
        let percent = (100.0 * *done as f64 / self.total as f64).round() as u8;
        self.sink.report(percent);
    }
}

/// One execution of a calibration request.
#[derive(Debug)]
pub struct CalibrationRun {
    request: CalibrationRequest,
    calibrator: SpectralCalibrator,
    state: RunState,
}

impl CalibrationRun {
    /// Prepare a run.
    pub fn new(request: CalibrationRequest, calibrator: SpectralCalibrator) -> Self {
        Self {
            request,
            calibrator,
            state: RunState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Number of tasks the run will spawn.
    pub fn total_tasks(&self) -> usize {
        self.request.len()
    }

    /// Run every task to completion and aggregate the curves.
    ///
    /// Returns the first task failure if any task failed. A run executes once;
    /// later calls return [`Error::RunNotIdle`].
    pub fn execute<S, P>(
        &mut self,
        source: &S,
        progress: &P,
    ) -> Result<BTreeMap<String, CalibrationCurve>>
    where
        S: SignalSource + ?Sized,
        P: ProgressSink + ?Sized,
    {
        if self.state != RunState::Idle {
            return Err(Error::RunNotIdle(self.state.as_str()));
        }
        self.state = RunState::Running;
        let result = self.run_tasks(source, progress);
        self.state = match result {
            Ok(_) => RunState::Completed,
            Err(_) => RunState::Failed,
        };
        result
    }

    fn run_tasks<S, P>(&self, source: &S, progress: &P) -> Result<BTreeMap<String, CalibrationCurve>>
    where
        S: SignalSource + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let total = self.request.len();
        tracing::info!(tasks = total, "starting calibration run");

        let accumulator = CoilAccumulator::new();
        let failures: Mutex<Vec<Error>> = Mutex::new(Vec::new());
        let counter = ProgressCounter {
            done: Mutex::new(0),
            total,
            sink: progress,
        };
        let calibrator = &self.calibrator;

        std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .request
                .tasks()
                .iter()
                .map(|task| {
                    let accumulator = &accumulator;
                    let failures = &failures;
                    let counter = &counter;
                    let handle = scope.spawn(move || {
                        match process_task(calibrator, task, source) {
                            Ok(batch) => accumulator.append(&task.coil, batch),
                            Err(err) => failures.lock().push(task.wrap(err)),
                        }
                        counter.complete_one();
                    });
                    (task, handle)
                })
                .collect();

            for (task, handle) in handles {
                if handle.join().is_err() {
                    failures.lock().push(Error::TaskPanicked {
                        coil: task.coil.clone(),
                    });
                    counter.complete_one();
                }
            }
        });

        tracing::debug!(coils = accumulator.coil_count(), "all calibration tasks joined");

        let mut failures = failures.into_inner().into_iter();
        if let Some(first) = failures.next() {
            for discarded in failures {
                tracing::warn!(error = %discarded, "additional calibration task failure");
            }
            tracing::info!(error = %first, "calibration run failed");
            return Err(first);
        }

        let curves = aggregate(&accumulator.into_batches())?;
        tracing::info!(coils = curves.len(), "calibration run completed");
        Ok(curves)
    }
}

fn process_task<S: SignalSource + ?Sized>(
    calibrator: &SpectralCalibrator,
    task: &CalibrationTask,
    source: &S,
) -> Result<Vec<TransferSample>> {
    tracing::debug!(
        coil = %task.coil,
        waveform = %task.waveform,
        frequency = task.frequency,
        tx = %task.tx.display(),
        rx = %task.rx.display(),
        "processing calibration task"
    );
    let tx = source.read(&task.tx)?;
    let rx = source.read(&task.rx)?;
    let batch = calibrator.transfer(task.waveform, task.frequency, &tx, &rx)?;
    tracing::debug!(coil = %task.coil, samples = batch.len(), "calibration task done");
    Ok(batch)
}
