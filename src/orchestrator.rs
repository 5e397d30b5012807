//! Background stage loading and set saving.
//!
//! At most one worker runs at a time. Requests made while a worker is running are rejected
//! with [`OrchestratorError::Busy`]. The owning thread drains worker events with
//! [`LoadSaveOrchestrator::poll`]; it never blocks on the worker.

use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::game::GameType;
use crate::stage::{SaveReport, Stage, StageContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Load,
    Save,
}

impl JobKind {
    pub fn label(self) -> &'static str {
        match self {
            JobKind::Load => "stage load",
            JobKind::Save => "set save",
        }
    }

    fn thread_name(self) -> &'static str {
        match self {
            JobKind::Load => "stage-load",
            JobKind::Save => "set-save",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("a {0} is already running")]
    Busy(JobKind),
    #[error("failed to spawn {kind} worker: {source}")]
    Spawn {
        kind: JobKind,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub data_dir: PathBuf,
    pub stage_id: String,
    pub game: Option<Arc<GameType>>,
}

impl LoadRequest {
    pub fn new(data_dir: impl Into<PathBuf>, stage_id: impl Into<String>, game: Option<Arc<GameType>>) -> Self {
        Self { data_dir: data_dir.into(), stage_id: stage_id.into(), game }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Loaded { stage_id: String, generation: u64, objects: usize, fingerprint: blake3::Hash },
    Saved { report: SaveReport, fingerprint: blake3::Hash },
}

#[derive(Debug)]
pub struct JobCompletion {
    pub kind: JobKind,
    pub result: Result<JobOutcome>,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub enum OrchestratorEvent {
    Progress { kind: JobKind, percent: u8 },
    Finished(JobCompletion),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running(JobKind),
}

enum WorkerMessage {
    Progress(u8),
    Done(Result<JobOutcome>),
}

struct RunningJob {
    kind: JobKind,
    rx: mpsc::Receiver<WorkerMessage>,
    handle: Option<thread::JoinHandle<()>>,
    started: Instant,
}

pub struct LoadSaveOrchestrator {
    stage: StageContext,
    running: Option<RunningJob>,
}

impl LoadSaveOrchestrator {
    pub fn new(stage: StageContext) -> Self {
        Self { stage, running: None }
    }

    pub fn state(&self) -> OrchestratorState {
        match &self.running {
            Some(job) => OrchestratorState::Running(job.kind),
            None => OrchestratorState::Idle,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    /// Starts loading a stage; the loaded stage replaces the shared one when parsing is done.
    pub fn request_load(&mut self, request: LoadRequest) -> Result<(), OrchestratorError> {
        let stage = self.stage.clone();
        self.spawn(JobKind::Load, move |tx| run_load_job(&stage, request, tx))
    }

    /// Starts writing the current stage's set layers to disk.
    pub fn request_save(&mut self) -> Result<(), OrchestratorError> {
        let stage = self.stage.clone();
        self.spawn(JobKind::Save, move |_| run_save_job(&stage))
    }

    fn spawn<F>(&mut self, kind: JobKind, job: F) -> Result<(), OrchestratorError>
    where
        F: FnOnce(&mpsc::Sender<WorkerMessage>) -> Result<JobOutcome> + Send + 'static,
    {
        if let Some(running) = &self.running {
            warn!("Rejected {kind} request: {} in progress", running.kind);
            return Err(OrchestratorError::Busy(running.kind));
        }
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(kind.thread_name().to_string())
            .spawn(move || {
                let result = job(&tx);
                // The owner may have been dropped; nothing left to report to.
                let _ = tx.send(WorkerMessage::Done(result));
            })
            .map_err(|source| OrchestratorError::Spawn { kind, source })?;
        info!("Started {kind} worker");
        self.running = Some(RunningJob { kind, rx, handle: Some(handle), started: Instant::now() });
        Ok(())
    }

    /// Returns the next worker event, if any, without blocking.
    pub fn poll(&mut self) -> Option<OrchestratorEvent> {
        let running = self.running.as_mut()?;
        let kind = running.kind;
        let result = match running.rx.try_recv() {
            Ok(WorkerMessage::Progress(percent)) => return Some(OrchestratorEvent::Progress { kind, percent }),
            Ok(WorkerMessage::Done(result)) => result,
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => Err(anyhow!("{kind} worker exited without reporting")),
        };
        let mut finished = self.running.take()?;
        if let Some(handle) = finished.handle.take() {
            if handle.join().is_err() {
                error!("{kind} worker panicked");
            }
        }
        let elapsed = finished.started.elapsed();
        match &result {
            Ok(_) => info!("Finished {kind} in {:.1} ms", elapsed.as_secs_f64() * 1000.0),
            Err(err) => warn!("{kind} failed after {:.1} ms: {err:#}", elapsed.as_secs_f64() * 1000.0),
        }
        Some(OrchestratorEvent::Finished(JobCompletion { kind, result, elapsed }))
    }
}

impl Drop for LoadSaveOrchestrator {
    fn drop(&mut self) {
        if let Some(mut running) = self.running.take() {
            debug!("Waiting for {} worker before shutdown", running.kind);
            if let Some(handle) = running.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

fn run_load_job(
    stage: &StageContext,
    request: LoadRequest,
    tx: &mpsc::Sender<WorkerMessage>,
) -> Result<JobOutcome> {
    let LoadRequest { data_dir, stage_id, game } = request;
    let loaded = Stage::load_with_progress(&data_dir, &stage_id, game, |done, total| {
        let percent = if total == 0 { 100 } else { (done * 100 / total).min(100) as u8 };
        let _ = tx.send(WorkerMessage::Progress(percent));
    })?;
    let objects = loaded.object_count();
    let fingerprint = loaded.fingerprint();
    let generation = stage.replace(loaded);
    Ok(JobOutcome::Loaded { stage_id, generation, objects, fingerprint })
}

fn run_save_job(stage: &StageContext) -> Result<JobOutcome> {
    let guard = stage.read();
    let report = guard.save_sets()?;
    let fingerprint = guard.fingerprint();
    Ok(JobOutcome::Saved { report, fingerprint })
}
