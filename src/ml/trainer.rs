// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Iteration-based training with two Adam optimisers.
//
// One iteration:
//   1. Sample batch_size pairs (with replacement) and pad them
//   2. Encode the whole query batch
//   3. Decoder starts from SOS and the first decoder_n_layers
//      rows of the encoder's final hidden state
//   4. One coin flip decides teacher forcing for the whole batch:
//        forced  → next input is the true target word
//        free    → next input is the decoder's own argmax
//      Either way all max_target_len steps run.
//   5. Sum the masked per-step losses and backpropagate once
//   6. Split gradients: decoder parameters go to the decoder
//      optimiser (lr × decoder_learning_ratio), everything else
//      (shared embedding + encoder) to the encoder optimiser
//   7. Each group is clipped to `clip` over its combined norm
//      before its optimiser steps
//
// Key Burn insight:
//   - Training uses an Autodiff backend for gradients
//   - GradientsParams::from_module() pulls one submodule's
//     gradients out of the backward pass; from_grads() then
//     collects whatever is left
//   - Adam state is keyed by parameter id, so two optimisers
//     over the same model never touch each other's state
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam
//            Williams & Zipser (1989) teacher forcing

use anyhow::{Context, Result};
use burn::{
    data::dataset::Dataset,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{PairBatch, PairBatcher},
    dataset::PairDataset,
};
use crate::domain::{error::ChatbotError, vocabulary::Vocabulary};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointState},
    metrics::{IterationMetrics, MetricsLogger},
};
use crate::ml::{
    grad_clip::clip_group_grad_norm,
    loss::mask_nll_loss,
    model::{start_tokens, Seq2Seq, Seq2SeqConfig},
};

#[cfg(feature = "wgpu")]
type GpuBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
type CpuBackend = burn::backend::Autodiff<burn::backend::NdArray>;

/// Where a run ended up
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub last_iteration: usize,
    pub last_loss:      f64,
}

/// Pick the backend and run the whole training loop.
/// `resume_from` is the iteration of the checkpoint to continue from.
pub fn run_training(
    cfg:          &TrainConfig,
    vocabulary:   &Vocabulary,
    dataset:      PairDataset,
    ckpt_manager: &CheckpointManager,
    resume_from:  Option<usize>,
) -> Result<TrainSummary> {
    if cfg.cpu {
        let device = burn::backend::ndarray::NdArrayDevice::Cpu;
        tracing::info!("Using NdArray device: {:?}", device);
        return train_loop::<CpuBackend>(cfg, vocabulary, dataset, ckpt_manager, resume_from, device);
    }

    #[cfg(feature = "wgpu")]
    {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        train_loop::<GpuBackend>(cfg, vocabulary, dataset, ckpt_manager, resume_from, device)
    }

    #[cfg(not(feature = "wgpu"))]
    {
        tracing::warn!("Built without the wgpu feature, training on the CPU");
        let device = burn::backend::ndarray::NdArrayDevice::Cpu;
        train_loop::<CpuBackend>(cfg, vocabulary, dataset, ckpt_manager, resume_from, device)
    }
}

/// Adam without built-in clipping; groups are clipped in `train_iteration`
fn adam() -> AdamConfig {
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    AdamConfig::new().with_epsilon(1e-8)
}

/// RNG seed for a run that starts at `start_iteration`. A fresh run uses
/// `seed` itself; a resumed one gets a different stream so it does not
/// replay the batch and teacher-forcing draws of iterations 1, 2, ...
pub fn run_seed(seed: u64, start_iteration: usize) -> u64 {
    let offset = start_iteration.saturating_sub(1) as u64;
    seed ^ offset.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    vocabulary:   &Vocabulary,
    dataset:      PairDataset,
    ckpt_manager: &CheckpointManager,
    resume_from:  Option<usize>,
    device:       B::Device,
) -> Result<TrainSummary> {
    cfg.validate()?;
    if dataset.is_empty() {
        return Err(ChatbotError::EmptyBatch).context("No sentence pairs left to train on");
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config(vocabulary.num_words);
    model_cfg.validate()?;
    B::seed(cfg.seed);

    let model: Seq2Seq<B> = model_cfg.init(&device);
    let encoder_optim = adam().init::<B, Seq2Seq<B>>();
    let decoder_optim = adam().init::<B, Seq2Seq<B>>();

    // ── Resume ────────────────────────────────────────────────────────────────
    let (mut model, mut encoder_optim, mut decoder_optim, start_iteration) = match resume_from {
        Some(iteration) => {
            let (model, enc, dec, last) = resume(
                ckpt_manager, iteration, &model_cfg, model, encoder_optim, decoder_optim, &device,
            )?;
            tracing::info!("Resuming from iteration {}", last);
            B::seed(run_seed(cfg.seed, last + 1));
            (model, enc, dec, last + 1)
        }
        None => (model, encoder_optim, decoder_optim, 1),
    };
    tracing::info!(
        "Model ready: hidden={}, layers={}-{}, attention={}, vocab={}",
        model_cfg.hidden_size,
        model_cfg.encoder_n_layers,
        model_cfg.decoder_n_layers,
        model_cfg.attention,
        model_cfg.vocab_size,
    );

    let batcher = PairBatcher::<B>::new(device.clone());
    let metrics = MetricsLogger::new(ckpt_manager.dir())?;
    let mut rng = StdRng::seed_from_u64(run_seed(cfg.seed, start_iteration));

    let mut print_loss = 0.0f64;
    let mut summary = TrainSummary { last_iteration: start_iteration.saturating_sub(1), last_loss: f64::NAN };

    tracing::info!("Training from iteration {} to {}", start_iteration, cfg.n_iteration);
    for iteration in start_iteration..=cfg.n_iteration {
        let items = (0..cfg.batch_size)
            .map(|_| dataset.get(rng.gen_range(0..dataset.len())))
            .collect::<Option<Vec<_>>>()
            .context("Sampled an index outside the dataset")?;
        let batch = batcher.batch(items)?;

        let (next, loss) = train_iteration(
            model, &mut encoder_optim, &mut decoder_optim, &batch, cfg, &mut rng,
        )?;
        model = next;
        print_loss += loss;
        summary = TrainSummary { last_iteration: iteration, last_loss: loss };

        if iteration % cfg.print_every == 0 {
            let average = print_loss / cfg.print_every as f64;
            tracing::info!(
                "Iteration: {}; Percent complete: {:.1}%; Average loss: {:.4}",
                iteration,
                iteration as f64 / cfg.n_iteration as f64 * 100.0,
                average,
            );
            metrics.log(&IterationMetrics::new(iteration, average))?;
            print_loss = 0.0;
        }

        if iteration % cfg.save_every == 0 {
            let state = CheckpointState {
                iteration,
                loss,
                vocabulary: vocabulary.clone(),
                model: model_cfg.clone(),
            };
            ckpt_manager.save(&state, &model, &encoder_optim, &decoder_optim)?;
            tracing::info!("Checkpoint saved for iteration {}", iteration);
        }
    }

    tracing::info!("Training complete!");
    Ok(summary)
}

/// Load a training checkpoint into freshly built model and optimisers.
/// Everything is read before anything is applied.
fn resume<B, O>(
    ckpt_manager:  &CheckpointManager,
    iteration:     usize,
    model_cfg:     &Seq2SeqConfig,
    model:         Seq2Seq<B>,
    encoder_optim: O,
    decoder_optim: O,
    device:        &B::Device,
) -> Result<(Seq2Seq<B>, O, O, usize)>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2Seq<B>, B>,
{
    let checkpoint = ckpt_manager.load_training::<B, O>(iteration, device)?;
    model_cfg.check_compatible(&checkpoint.state.model)?;

    Ok((
        model.load_record(checkpoint.model),
        encoder_optim.load_record(checkpoint.encoder_optimizer),
        decoder_optim.load_record(checkpoint.decoder_optimizer),
        checkpoint.state.iteration,
    ))
}

/// One forward/backward pass and one step of both optimisers.
/// Returns the updated model and the token-weighted average loss.
pub fn train_iteration<B, O>(
    model:         Seq2Seq<B>,
    encoder_optim: &mut O,
    decoder_optim: &mut O,
    batch:         &PairBatch<B>,
    cfg:           &TrainConfig,
    rng:           &mut StdRng,
) -> Result<(Seq2Seq<B>, f64)>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2Seq<B>, B>,
{
    let device = batch.device();
    model.check_device(&device)?;
    let batch_size = batch.batch_size();

    // ── Forward ───────────────────────────────────────────────────────────────
    let encoded = model.encode(batch.input.clone(), &batch.lengths);
    let mut decoder_input  = start_tokens::<B>(batch_size, &device);
    let mut decoder_hidden = model.decoder_initial_hidden(encoded.hidden);

    let use_teacher_forcing = rng.gen::<f64>() < cfg.teacher_forcing_ratio;

    let mut step_losses = Vec::with_capacity(batch.max_target_len);
    let mut print_losses = 0.0f64;
    let mut n_totals = 0usize;

    for t in 0..batch.max_target_len {
        let out = model.decode_step(decoder_input, decoder_hidden, encoded.outputs.clone());
        decoder_hidden = out.hidden;

        let target_t = batch.target.clone().slice([t..t + 1, 0..batch_size]);
        decoder_input = if use_teacher_forcing {
            target_t.clone()
        } else {
            // argmax(1) returns [batch, 1]; the decoder wants [1, batch]
            out.probs.clone().argmax(1).reshape([1, batch_size])
        };

        let mask_t = batch.mask.clone().slice([t..t + 1, 0..batch_size]).reshape([batch_size]);
        let (loss, n_total) = mask_nll_loss(out.probs, target_t.reshape([batch_size]), mask_t)?;

        print_losses += loss.clone().into_scalar().elem::<f64>() * n_total as f64;
        n_totals += n_total;
        step_losses.push(loss);
    }

    // ── Backward + two optimiser steps ────────────────────────────────────────
    let total = Tensor::cat(step_losses, 0).sum();
    let mut grads = total.backward();

    let decoder_grads = GradientsParams::from_module(&mut grads, &model.decoder);
    let encoder_grads = GradientsParams::from_grads(grads, &model);

    let (decoder_grads, decoder_norm) = clip_group_grad_norm(&model.decoder, decoder_grads, cfg.clip);
    let (encoder_grads, encoder_norm) = clip_group_grad_norm(&model, encoder_grads, cfg.clip);
    tracing::trace!("Gradient norms: encoder {:.4}, decoder {:.4}", encoder_norm, decoder_norm);

    let model = decoder_optim.step(cfg.learning_rate * cfg.decoder_learning_ratio, model, decoder_grads);
    let model = encoder_optim.step(cfg.learning_rate, model, encoder_grads);

    Ok((model, print_losses / n_totals.max(1) as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::trimmer::build_vocabulary;
    use crate::domain::sentence_pair::SentencePair;
    use crate::ml::attention::AttentionMethod;
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn small_config() -> TrainConfig {
        TrainConfig {
            hidden_size:            16,
            encoder_n_layers:       1,
            decoder_n_layers:       1,
            dropout:                0.0,
            attention:              AttentionMethod::Dot,
            batch_size:             4,
            learning_rate:          0.005,
            decoder_learning_ratio: 2.0,
            teacher_forcing_ratio:  1.0,
            seed:                   7,
            cpu:                    true,
            ..TrainConfig::default()
        }
    }

    fn hello_data() -> (Vocabulary, PairDataset) {
        let pairs = vec![SentencePair::new("hello", "hi there")];
        let voc   = build_vocabulary("hello", &pairs);
        let data  = PairDataset::from_sentences(&voc, &pairs).unwrap();
        (voc, data)
    }

    fn batch(dataset: &PairDataset, n: usize) -> PairBatch<TestBackend> {
        let items = (0..n).map(|_| dataset.get(0).unwrap()).collect();
        PairBatcher::<TestBackend>::new(NdArrayDevice::Cpu).batch(items).unwrap()
    }

    fn train(cfg: &TrainConfig, iterations: usize) -> Vec<f64> {
        let device = NdArrayDevice::Cpu;
        TestBackend::seed(cfg.seed);
        let (voc, dataset) = hello_data();
        let mut model: Seq2Seq<TestBackend> = cfg.model_config(voc.num_words).init(&device);
        let mut enc = adam().init::<TestBackend, Seq2Seq<TestBackend>>();
        let mut dec = adam().init::<TestBackend, Seq2Seq<TestBackend>>();
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let batch   = batch(&dataset, cfg.batch_size);

        let mut losses = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            let (next, loss) = train_iteration(model, &mut enc, &mut dec, &batch, cfg, &mut rng).unwrap();
            model = next;
            losses.push(loss);
        }
        losses
    }

    #[test]
    fn test_converges_on_a_single_pair() {
        let losses = train(&small_config(), 200);
        let first  = losses[..5].iter().sum::<f64>() / 5.0;
        let last   = losses[losses.len() - 5..].iter().sum::<f64>() / 5.0;
        assert!(last <= first * 0.5, "loss went from {first:.4} to {last:.4}");
    }

    #[test]
    fn test_free_running_iteration_is_finite() {
        let mut cfg = small_config();
        cfg.teacher_forcing_ratio = 0.0;
        let losses = train(&cfg, 3);
        assert!(losses.iter().all(|l| l.is_finite() && *l > 0.0));
    }

    #[test]
    fn test_resumed_run_draws_a_fresh_stream() {
        assert_eq!(run_seed(42, 1), 42);
        assert_ne!(run_seed(42, 5), 42);
        assert_ne!(run_seed(42, 5), run_seed(42, 9));

        let mut fresh   = StdRng::seed_from_u64(run_seed(42, 1));
        let mut resumed = StdRng::seed_from_u64(run_seed(42, 5));
        let a: Vec<u32> = (0..8).map(|_| fresh.gen()).collect();
        let b: Vec<u32> = (0..8).map(|_| resumed.gen()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_train_loop_saves_and_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = small_config();
        cfg.n_iteration = 4;
        cfg.save_every  = 2;
        cfg.print_every = 2;

        let ckpt = CheckpointManager::new(dir.path());
        let (voc, dataset) = hello_data();
        let summary = train_loop::<TestBackend>(&cfg, &voc, dataset, &ckpt, None, NdArrayDevice::Cpu).unwrap();
        assert_eq!(summary.last_iteration, 4);
        assert_eq!(ckpt.latest_iteration().unwrap(), 4);

        cfg.n_iteration = 6;
        let (voc, dataset) = hello_data();
        let summary = train_loop::<TestBackend>(&cfg, &voc, dataset, &ckpt, Some(4), NdArrayDevice::Cpu).unwrap();
        assert_eq!(summary.last_iteration, 6);
        assert_eq!(ckpt.latest_iteration().unwrap(), 6);

        let metrics = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(metrics.lines().count(), 1 + 3);
    }

    #[test]
    fn test_resume_with_other_architecture_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = small_config();
        cfg.n_iteration = 1;
        cfg.save_every  = 1;

        let ckpt = CheckpointManager::new(dir.path());
        let (voc, dataset) = hello_data();
        train_loop::<TestBackend>(&cfg, &voc, dataset, &ckpt, None, NdArrayDevice::Cpu).unwrap();

        cfg.hidden_size = 8;
        cfg.n_iteration = 2;
        let (voc, dataset) = hello_data();
        let err = train_loop::<TestBackend>(&cfg, &voc, dataset, &ckpt, Some(1), NdArrayDevice::Cpu).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatbotError>(),
            Some(ChatbotError::CheckpointMismatch { .. })
        ));
    }
}
