// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores complete training snapshots.
//
// What gets saved per checkpoint:
//   1. model.mpk.gz             — embedding, encoder, decoder and
//                                 attention weights
//   2. encoder_optimizer.mpk.gz — Adam moments for embedding + encoder
//   3. decoder_optimizer.mpk.gz — Adam moments for the decoder
//   4. state.json               — iteration, last loss, vocabulary
//                                 and model architecture
//
// Records use NamedMpkGzFileRecorder with full precision, so a
// reloaded parameter is bit-identical to the saved one.
//
// File naming convention:
//   <save_dir>/<model_name>/<corpus_name>/<enc>-<dec>_<hidden>/
//     500_checkpoint/
//       model.mpk.gz
//       encoder_optimizer.mpk.gz
//       decoder_optimizer.mpk.gz
//       state.json
//     1000_checkpoint/
//     ...
//     latest_iteration.json   ← number of the newest checkpoint
//     metrics.csv
//
// Loading reads every file of a checkpoint before anything is
// applied, so a broken checkpoint never leaves a half-restored
// model behind.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::domain::vocabulary::Vocabulary;
use crate::ml::model::{Seq2Seq, Seq2SeqConfig};

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const LATEST_FILE: &str = "latest_iteration.json";
const STATE_FILE:  &str = "state.json";

/// Everything about a checkpoint that is not a tensor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub iteration:  usize,
    pub loss:       f64,
    pub vocabulary: Vocabulary,
    pub model:      Seq2SeqConfig,
}

/// A fully read training checkpoint, not yet applied to anything
pub struct TrainingCheckpoint<B: AutodiffBackend, O: Optimizer<Seq2Seq<B>, B>> {
    pub state:             CheckpointState,
    pub model:             <Seq2Seq<B> as Module<B>>::Record,
    pub encoder_optimizer: O::Record,
    pub decoder_optimizer: O::Record,
}

/// Manages the checkpoints of one training run directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn checkpoint_dir(&self, iteration: usize) -> PathBuf {
        self.dir.join(format!("{iteration}_checkpoint"))
    }

    /// Write model, both optimisers and the state file, then move the
    /// latest-iteration pointer. Returns the checkpoint directory.
    pub fn save<B, O>(
        &self,
        state:             &CheckpointState,
        model:             &Seq2Seq<B>,
        encoder_optimizer: &O,
        decoder_optimizer: &O,
    ) -> Result<PathBuf>
    where
        B: AutodiffBackend,
        O: Optimizer<Seq2Seq<B>, B>,
    {
        let dir = self.checkpoint_dir(state.iteration);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;

        // Recorder adds the .mpk.gz extension itself
        let recorder = CheckpointRecorder::new();
        recorder
            .record(model.clone().into_record(), dir.join("model"))
            .with_context(|| format!("Failed to save model to '{}'", dir.display()))?;
        Recorder::<B>::record(&recorder, encoder_optimizer.to_record(), dir.join("encoder_optimizer"))
            .with_context(|| "Failed to save encoder optimizer state")?;
        Recorder::<B>::record(&recorder, decoder_optimizer.to_record(), dir.join("decoder_optimizer"))
            .with_context(|| "Failed to save decoder optimizer state")?;

        fs::write(dir.join(STATE_FILE), serde_json::to_string_pretty(state)?)
            .with_context(|| "Failed to write state.json")?;

        // Pointer last: a crash mid-save leaves the previous checkpoint as latest
        fs::write(self.dir.join(LATEST_FILE), serde_json::to_string(&state.iteration)?)
            .with_context(|| "Failed to write latest_iteration.json")?;

        tracing::debug!("Saved checkpoint '{}'", dir.display());
        Ok(dir)
    }

    /// Save the run's training configuration to JSON.
    pub fn save_config<C: Serialize>(&self, cfg: &C) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.dir.join("train_config.json");
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Read latest_iteration.json and return the iteration number.
    /// Returns an error if nothing has been saved yet.
    pub fn latest_iteration(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s = fs::read_to_string(&path).with_context(|| {
            format!("Cannot find '{}'. Have you run 'train' first?", path.display())
        })?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }

    pub fn load_state(&self, iteration: usize) -> Result<CheckpointState> {
        let path = self.checkpoint_dir(iteration).join(STATE_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read checkpoint state '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Corrupt checkpoint state '{}'", path.display()))
    }

    /// Model weights only, for inference
    pub fn load_model_record<B: Backend>(
        &self,
        iteration: usize,
        device:    &B::Device,
    ) -> Result<<Seq2Seq<B> as Module<B>>::Record> {
        let path = self.checkpoint_dir(iteration).join("model");
        Recorder::<B>::load(&CheckpointRecorder::new(), path.clone(), device).with_context(|| {
            format!("Cannot load model weights '{}'", path.display())
        })
    }

    /// Everything needed to continue training from `iteration`
    pub fn load_training<B, O>(&self, iteration: usize, device: &B::Device) -> Result<TrainingCheckpoint<B, O>>
    where
        B: AutodiffBackend,
        O: Optimizer<Seq2Seq<B>, B>,
    {
        tracing::info!("Loading checkpoint from iteration {}", iteration);
        let dir      = self.checkpoint_dir(iteration);
        let state    = self.load_state(iteration)?;
        let model    = self.load_model_record::<B>(iteration, device)?;
        let recorder = CheckpointRecorder::new();

        let encoder_optimizer: O::Record = Recorder::<B>::load(&recorder, dir.join("encoder_optimizer"), device)
            .with_context(|| "Cannot load encoder optimizer state")?;
        let decoder_optimizer: O::Record = Recorder::<B>::load(&recorder, dir.join("decoder_optimizer"), device)
            .with_context(|| "Cannot load decoder optimizer state")?;

        Ok(TrainingCheckpoint { state, model, encoder_optimizer, decoder_optimizer })
    }
}
