//! Training thread that runs independently from the front end.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::checkpoint::CheckpointManager;
use crate::error::EvoError;
use crate::evolution::{EpochOutcome, EvolutionEngine};

use super::commands::{RunSettings, RunState};
use super::snapshot::{NetworkView, Phase, TrainingSnapshot, WorldView};

/// Steps the showcase world is advanced before it is sent
const SHOWCASE_STEPS: usize = 10;

/// Handle for controlling a background training run
pub struct TrainingHandle {
    thread: Option<JoinHandle<Result<EvolutionEngine, EvoError>>>,
    snapshot_rx: Receiver<TrainingSnapshot>,
    cancel: Arc<AtomicBool>,
    /// Last state seen through snapshots
    pub state: RunState,
}

impl TrainingHandle {
    /// Build the engine from `settings` and start training on a new thread.
    ///
    /// Invalid settings are reported here, before any thread is spawned.
    pub fn setup(settings: RunSettings, seed: u64) -> Result<Self, EvoError> {
        Self::setup_with_checkpoints(settings, seed, None)
    }

    /// Like [`setup`](Self::setup), saving checkpoints through `checkpoints`
    pub fn setup_with_checkpoints(
        mut settings: RunSettings,
        seed: u64,
        checkpoints: Option<CheckpointManager>,
    ) -> Result<Self, EvoError> {
        let config = settings.to_config();
        let engine = match settings.pool.take() {
            Some(pool) => EvolutionEngine::with_pool(config, pool, seed)?,
            None => EvolutionEngine::new(config, seed)?,
        };
        Ok(Self::spawn(engine, checkpoints))
    }

    /// Drive an already built engine for its remaining epochs
    pub fn spawn(engine: EvolutionEngine, checkpoints: Option<CheckpointManager>) -> Self {
        let (snapshot_tx, snapshot_rx) = mpsc::channel();
        let cancel = engine.cancel_flag();

        let thread = thread::spawn(move || run_training(engine, checkpoints, snapshot_tx));

        Self {
            thread: Some(thread),
            snapshot_rx,
            cancel,
            state: RunState::Running,
        }
    }

    /// Try to receive the latest snapshot (non-blocking)
    pub fn try_recv_snapshot(&mut self) -> Option<TrainingSnapshot> {
        let mut latest = None;
        // Drain all available snapshots, keep only the latest
        loop {
            match self.snapshot_rx.try_recv() {
                Ok(snapshot) => latest = Some(snapshot),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if let Some(snapshot) = &latest {
            self.observe(snapshot.phase);
        }
        latest
    }

    fn observe(&mut self, phase: Phase) {
        self.state = match phase {
            Phase::Finished => RunState::Finished,
            Phase::Cancelled => RunState::Cancelled,
            Phase::Failed => RunState::Failed("training failed".to_string()),
            _ => RunState::Running,
        };
    }

    /// Ask the run to stop at the next genome boundary
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Wait for the run to end and take back the engine
    pub fn join(mut self) -> Result<EvolutionEngine, EvoError> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| EvoError::Worker("training thread already joined".to_string()))?;
        thread
            .join()
            .map_err(|_| EvoError::Worker("training thread panicked".to_string()))?
    }
}

impl Drop for TrainingHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.cancel();
            let _ = thread.join();
        }
    }
}

fn full_snapshot(engine: &EvolutionEngine, phase: Phase) -> TrainingSnapshot {
    let mut snapshot = TrainingSnapshot::progress(
        phase,
        engine.epoch(),
        engine.config().fitness.num_epochs,
        engine.best_fitness(),
    );
    snapshot.last_stats = engine.history().last().cloned();
    snapshot.best_network = match engine.best_network() {
        Some(Ok(network)) => Some(NetworkView::from_network(&network)),
        _ => None,
    };
    if let Some(Ok(mut world)) = engine.showcase() {
        match world.run(SHOWCASE_STEPS) {
            Ok(()) => {
                snapshot.live_network = world
                    .agent(0)
                    .map(|agent| NetworkView::from_network(&agent.brain));
                snapshot.live_world = Some(WorldView::from_world(&world));
            }
            Err(e) => log::debug!("Showcase run failed: {}", e),
        }
    }
    snapshot
}

/// Main training loop running in separate thread
fn run_training(
    mut engine: EvolutionEngine,
    mut checkpoints: Option<CheckpointManager>,
    snapshot_tx: Sender<TrainingSnapshot>,
) -> Result<EvolutionEngine, EvoError> {
    let num_epochs = engine.config().fitness.num_epochs;
    log::info!(
        "Training started: epoch={}, target={}, pool={}",
        engine.epoch(),
        num_epochs,
        engine.pool().len()
    );
    let _ = snapshot_tx.send(full_snapshot(&engine, Phase::Starting));

    while engine.remaining_epochs() > 0 {
        let epoch = engine.epoch();
        let best = engine.best_fitness();
        let progress_tx = snapshot_tx.clone();
        let outcome = engine.run_epoch_observed(|phase| {
            let _ = progress_tx.send(TrainingSnapshot::progress(phase, epoch, num_epochs, best));
        });

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Epoch {} failed: {}", epoch, e);
                let _ = snapshot_tx.send(full_snapshot(&engine, Phase::Failed));
                return Err(e);
            }
        };

        let phase = match outcome {
            EpochOutcome::Cancelled => {
                log::info!("Training cancelled at epoch {}", engine.epoch());
                let _ = snapshot_tx.send(full_snapshot(&engine, Phase::Cancelled));
                return Ok(engine);
            }
            EpochOutcome::Reinitialized(_) => Phase::Reinitializing,
            EpochOutcome::Evolved(_) => Phase::Evolving,
        };

        if let Some(manager) = checkpoints.as_mut() {
            if manager.should_save(engine.epoch()) {
                match manager.save(&engine.create_checkpoint()) {
                    Ok(path) => log::debug!("Auto-checkpoint saved: {}", path.display()),
                    Err(e) => log::warn!("Auto-checkpoint failed: {}", e),
                }
            }
        }

        let _ = snapshot_tx.send(full_snapshot(&engine, phase));
    }

    log::info!(
        "Training finished: epochs={}, best={:.2}",
        engine.epoch(),
        engine.best_fitness()
    );
    let _ = snapshot_tx.send(full_snapshot(&engine, Phase::Finished));
    Ok(engine)
}
