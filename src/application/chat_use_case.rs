// ============================================================
// Layer 2 — Chat Use Case
// ============================================================
// Loads a trained checkpoint and runs the read–reply loop:
//
//   > hello?
//   Bot: hello .
//   > xyzzy
//   Error: Encountered unknown word.
//   > q
//
// Every turn is isolated: an unknown word, any other responder
// error, or an input line that is not valid UTF-8 is reported and
// the loop moves on. Only failing to write the output, or failing
// to read input at all, ends the session.
//
// The loop itself (ChatSession) only knows the Responder trait,
// so it is tested with a stub instead of a real model.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use crate::application::train_use_case::{corpus_name, run_dir};
use crate::domain::{error::ChatbotError, traits::Responder};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    attention::AttentionMethod,
    inferencer::Inferencer,
    model::Seq2SeqConfig,
};

const PROMPT: &str = "> ";
const UNKNOWN_WORD_REPLY: &str = "Error: Encountered unknown word.";

/// Which run directory to load from and what it must contain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub corpus_dir:       String,
    pub save_dir:         String,
    pub model_name:       String,
    pub attention:        AttentionMethod,
    pub hidden_size:      usize,
    pub encoder_n_layers: usize,
    pub decoder_n_layers: usize,
    pub max_length:       usize,
    pub checkpoint_iter:  Option<usize>,
    pub cpu:              bool,
}

// ─── ChatSession ──────────────────────────────────────────────────────────────
pub struct ChatSession<R: Responder> {
    responder: R,
}

impl<R: Responder> ChatSession<R> {
    pub fn new(responder: R) -> Self {
        Self { responder }
    }

    /// Run until `q`, `quit` or end of input. Returns the number of
    /// lines answered (failed turns included).
    pub fn run<I: BufRead, W: Write>(&self, mut input: I, mut output: W) -> Result<usize> {
        let mut turns = 0;
        let mut raw   = Vec::new();

        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            raw.clear();
            match input.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!("Stopped reading input: {}", err);
                    break;
                }
            }
            let line     = String::from_utf8_lossy(&raw);
            let sentence = line.trim_end_matches(['\r', '\n']);
            if sentence == "q" || sentence == "quit" {
                break;
            }

            match self.responder.respond(sentence) {
                Ok(reply) => writeln!(output, "Bot: {reply}")?,
                Err(err) => match err.downcast_ref::<ChatbotError>() {
                    Some(ChatbotError::UnknownWord(word)) => {
                        tracing::debug!("Unknown word '{}'", word);
                        writeln!(output, "{UNKNOWN_WORD_REPLY}")?;
                    }
                    _ => {
                        tracing::warn!("Turn failed: {:#}", err);
                        writeln!(output, "Error: {err}")?;
                    }
                },
            }
            turns += 1;
        }

        Ok(turns)
    }
}

// ─── ChatUseCase ──────────────────────────────────────────────────────────────
pub struct ChatUseCase {
    session: ChatSession<Box<dyn Responder>>,
}

impl Responder for Box<dyn Responder> {
    fn respond(&self, line: &str) -> Result<String> {
        self.as_ref().respond(line)
    }
}

impl ChatUseCase {
    pub fn new(cfg: &ChatConfig) -> Result<Self> {
        let ckpt_manager = CheckpointManager::new(run_dir(
            &cfg.save_dir,
            &cfg.model_name,
            &corpus_name(&cfg.corpus_dir),
            cfg.encoder_n_layers,
            cfg.decoder_n_layers,
            cfg.hidden_size,
        ));
        let iteration = match cfg.checkpoint_iter {
            Some(iteration) => iteration,
            None => ckpt_manager.latest_iteration()?,
        };

        let responder = load_responder(cfg, &ckpt_manager, iteration)?;
        Ok(Self { session: ChatSession::new(responder) })
    }

    pub fn run<I: BufRead, W: Write>(&self, input: I, output: W) -> Result<usize> {
        self.session.run(input, output)
    }
}

fn load_responder(cfg: &ChatConfig, ckpt_manager: &CheckpointManager, iteration: usize) -> Result<Box<dyn Responder>> {
    if cfg.cpu {
        let device = burn::backend::ndarray::NdArrayDevice::Cpu;
        return Ok(Box::new(load_checked::<burn::backend::NdArray>(cfg, ckpt_manager, iteration, device)?));
    }

    #[cfg(feature = "wgpu")]
    {
        let device = burn::backend::wgpu::WgpuDevice::default();
        Ok(Box::new(load_checked::<burn::backend::Wgpu>(cfg, ckpt_manager, iteration, device)?))
    }

    #[cfg(not(feature = "wgpu"))]
    {
        let device = burn::backend::ndarray::NdArrayDevice::Cpu;
        Ok(Box::new(load_checked::<burn::backend::NdArray>(cfg, ckpt_manager, iteration, device)?))
    }
}

/// Load the checkpoint and make sure it is the model the flags describe
fn load_checked<B: burn::prelude::Backend>(
    cfg:          &ChatConfig,
    ckpt_manager: &CheckpointManager,
    iteration:    usize,
    device:       B::Device,
) -> Result<Inferencer<B>> {
    let inferencer = Inferencer::<B>::from_checkpoint(ckpt_manager, iteration, cfg.max_length, device)?;
    let expected = Seq2SeqConfig::new(
        inferencer.vocabulary().num_words,
        cfg.hidden_size,
        cfg.encoder_n_layers,
        cfg.decoder_n_layers,
        0.0,
        cfg.attention,
    );
    expected.check_compatible(inferencer.model_config())?;
    Ok(inferencer)
}
