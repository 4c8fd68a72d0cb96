// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration     (Layer 2)
//   Step 2: Read + normalise pairs         (Layer 4 - data)
//   Step 3: Drop over-long pairs           (Layer 4 - data)
//   Step 4: Vocabulary: fresh or restored  (Layer 4 / Layer 6)
//   Step 5: Trim rare words                (Layer 4 - data)
//   Step 6: Tokenise into a dataset        (Layer 4 - data)
//   Step 7: Save config                    (Layer 6 - infra)
//   Step 8: Run training loop              (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    dataset::PairDataset,
    loader::FormattedPairLoader,
    trimmer::{build_vocabulary, filter_pairs, trim_rare_words},
};
use crate::domain::{error::ChatbotError, traits::PairSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    attention::AttentionMethod,
    model::Seq2SeqConfig,
    trainer::{run_training, TrainSummary},
};

/// Name of the pair file `prepare` writes inside the corpus directory
pub const FORMATTED_FILE: &str = "formatted_movie_lines.txt";

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved next to the checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub corpus_dir:             String,
    pub save_dir:               String,
    pub model_name:             String,
    pub attention:              AttentionMethod,
    pub hidden_size:            usize,
    pub encoder_n_layers:       usize,
    pub decoder_n_layers:       usize,
    pub dropout:                f64,
    pub batch_size:             usize,
    pub max_length:             usize,
    pub min_count:              usize,
    pub clip:                   f64,
    pub teacher_forcing_ratio:  f64,
    pub learning_rate:          f64,
    pub decoder_learning_ratio: f64,
    pub n_iteration:            usize,
    pub print_every:            usize,
    pub save_every:             usize,
    pub seed:                   u64,
    pub checkpoint_iter:        Option<usize>,
    pub resume:                 bool,
    pub cpu:                    bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus_dir:             "data/cornell movie-dialogs corpus".to_string(),
            save_dir:               "data/save".to_string(),
            model_name:             "cb_model".to_string(),
            attention:              AttentionMethod::Dot,
            hidden_size:            500,
            encoder_n_layers:       2,
            decoder_n_layers:       2,
            dropout:                0.1,
            batch_size:             64,
            max_length:             10,
            min_count:              3,
            clip:                   50.0,
            teacher_forcing_ratio:  1.0,
            learning_rate:          1e-4,
            decoder_learning_ratio: 5.0,
            n_iteration:            4000,
            print_every:            1,
            save_every:             500,
            seed:                   42,
            checkpoint_iter:        None,
            resume:                 false,
            cpu:                    false,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), ChatbotError> {
        let checks = [
            (self.batch_size == 0, "batch size must be positive".to_string()),
            (self.max_length == 0, "max length must be positive".to_string()),
            (self.print_every == 0, "print interval must be positive".to_string()),
            (self.save_every == 0, "save interval must be positive".to_string()),
            (self.clip <= 0.0, format!("clip {} must be positive", self.clip)),
            (self.learning_rate <= 0.0, format!("learning rate {} must be positive", self.learning_rate)),
            (
                self.decoder_learning_ratio <= 0.0,
                format!("decoder learning ratio {} must be positive", self.decoder_learning_ratio),
            ),
            (
                !(0.0..=1.0).contains(&self.teacher_forcing_ratio),
                format!("teacher forcing ratio {} is outside [0, 1]", self.teacher_forcing_ratio),
            ),
        ];
        match checks.into_iter().find(|(failed, _)| *failed) {
            Some((_, msg)) => Err(ChatbotError::InvalidConfig(msg)),
            None => Ok(()),
        }
    }

    pub fn model_config(&self, vocab_size: usize) -> Seq2SeqConfig {
        Seq2SeqConfig::new(
            vocab_size,
            self.hidden_size,
            self.encoder_n_layers,
            self.decoder_n_layers,
            self.dropout,
            self.attention,
        )
    }

    /// Last component of the corpus directory, e.g. "cornell movie-dialogs corpus"
    pub fn corpus_name(&self) -> String {
        corpus_name(&self.corpus_dir)
    }

    pub fn datafile(&self) -> PathBuf {
        Path::new(&self.corpus_dir).join(FORMATTED_FILE)
    }

    pub fn run_dir(&self) -> PathBuf {
        run_dir(
            &self.save_dir,
            &self.model_name,
            &self.corpus_name(),
            self.encoder_n_layers,
            self.decoder_n_layers,
            self.hidden_size,
        )
    }
}

pub fn corpus_name(corpus_dir: &str) -> String {
    Path::new(corpus_dir)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| corpus_dir.to_string())
}

/// `<save_dir>/<model_name>/<corpus_name>/<enc>-<dec>_<hidden>`
pub fn run_dir(
    save_dir:         &str,
    model_name:       &str,
    corpus_name:      &str,
    encoder_n_layers: usize,
    decoder_n_layers: usize,
    hidden_size:      usize,
) -> PathBuf {
    Path::new(save_dir)
        .join(model_name)
        .join(corpus_name)
        .join(format!("{encoder_n_layers}-{decoder_n_layers}_{hidden_size}"))
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Fail fast on bad settings ─────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Load and normalise pairs ──────────────────────────────────
        let pairs = FormattedPairLoader::new(cfg.datafile()).load_pairs()?;
        tracing::info!("Read {} sentence pairs", pairs.len());

        // ── Step 3: Length filter ─────────────────────────────────────────────
        let pairs = filter_pairs(pairs, cfg.max_length);

        // ── Step 4: Vocabulary ────────────────────────────────────────────────
        // A resumed run must keep the word indexes the weights were trained on
        let ckpt_manager = CheckpointManager::new(cfg.run_dir());
        let resume_from  = self.resume_iteration(&ckpt_manager)?;
        let mut vocabulary = match resume_from {
            Some(iteration) => {
                let state = ckpt_manager.load_state(iteration)?;
                tracing::info!("Restored vocabulary of {} words from checkpoint", state.vocabulary.num_words);
                state.vocabulary
            }
            None => build_vocabulary(&cfg.corpus_name(), &pairs),
        };

        // ── Step 5: Rare-word trimming ────────────────────────────────────────
        let pairs = trim_rare_words(&mut vocabulary, pairs, cfg.min_count);

        // ── Step 6: Tokenise ──────────────────────────────────────────────────
        let dataset = PairDataset::from_sentences(&vocabulary, &pairs)?;

        // ── Step 7: Save config for later inspection ──────────────────────────
        ckpt_manager.save_config(cfg)?;

        // ── Step 8: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, &vocabulary, dataset, &ckpt_manager, resume_from)
    }

    /// An explicit --checkpoint-iter wins; --resume picks the newest one
    fn resume_iteration(&self, ckpt_manager: &CheckpointManager) -> Result<Option<usize>> {
        match (self.config.checkpoint_iter, self.config.resume) {
            (Some(iteration), _) => Ok(Some(iteration)),
            (None, true)         => Ok(Some(ckpt_manager.latest_iteration()?)),
            (None, false)        => Ok(None),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tiny_config(root: &Path) -> TrainConfig {
        TrainConfig {
            corpus_dir:       root.join("corpus").to_string_lossy().into_owned(),
            save_dir:         root.join("save").to_string_lossy().into_owned(),
            hidden_size:      8,
            encoder_n_layers: 1,
            decoder_n_layers: 1,
            batch_size:       2,
            min_count:        1,
            n_iteration:      2,
            save_every:       2,
            cpu:              true,
            ..TrainConfig::default()
        }
    }

    fn write_corpus(cfg: &TrainConfig) {
        fs::create_dir_all(&cfg.corpus_dir).unwrap();
        fs::write(cfg.datafile(), "Hello!\tHi there.\nHow are you?\tFine, thanks.\n").unwrap();
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let cfg = TrainConfig { teacher_forcing_ratio: 1.5, ..TrainConfig::default() };
        assert!(matches!(cfg.validate(), Err(ChatbotError::InvalidConfig(_))));

        let cfg = TrainConfig { batch_size: 0, ..TrainConfig::default() };
        assert!(matches!(cfg.validate(), Err(ChatbotError::InvalidConfig(_))));
    }

    #[test]
    fn test_run_dir_layout() {
        let cfg = TrainConfig::default();
        assert_eq!(
            cfg.run_dir(),
            PathBuf::from("data/save/cb_model/cornell movie-dialogs corpus/2-2_500")
        );
    }

    #[test]
    fn test_execute_trains_and_resumes() {
        let root = tempfile::tempdir().unwrap();
        let mut cfg = tiny_config(root.path());
        write_corpus(&cfg);

        let summary = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(summary.last_iteration, 2);
        assert!(cfg.run_dir().join("2_checkpoint").join("state.json").exists());
        assert!(cfg.run_dir().join("train_config.json").exists());

        cfg.resume = true;
        cfg.n_iteration = 4;
        let summary = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(summary.last_iteration, 4);
    }

    #[test]
    fn test_missing_pair_file_fails() {
        let root = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(root.path());
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
