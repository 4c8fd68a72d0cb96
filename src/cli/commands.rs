// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `prepare`, `train` and `chat`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, AttentionMethod)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{chat_use_case::ChatConfig, train_use_case::TrainConfig};
use crate::ml::attention::AttentionMethod;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract query/response pairs from the Cornell Movie-Dialogs corpus
    Prepare(PrepareArgs),

    /// Train the seq2seq chatbot on the prepared pairs
    Train(TrainArgs),

    /// Chat with a trained checkpoint
    Chat(ChatArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Directory holding movie_lines.txt and movie_conversations.txt
    #[arg(long, default_value = "data/cornell movie-dialogs corpus")]
    pub corpus_dir: String,
}

/// Flags shared by `train` and `chat`: they locate the run directory
/// and describe the model that lives in it.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Directory holding the corpus and its formatted pair file
    #[arg(long, default_value = "data/cornell movie-dialogs corpus")]
    pub corpus_dir: String,

    /// Root directory for checkpoints
    #[arg(long, default_value = "data/save")]
    pub save_dir: String,

    #[arg(long, default_value = "cb_model")]
    pub model_name: String,

    /// Attention scoring: dot, general or concat
    #[arg(long, default_value = "dot")]
    pub attention: AttentionMethod,

    /// Size of word vectors and GRU states
    #[arg(long, default_value_t = 500)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 2)]
    pub encoder_n_layers: usize,

    #[arg(long, default_value_t = 2)]
    pub decoder_n_layers: usize,

    /// Sentences with this many words or more are dropped; also the
    /// number of words generated per reply
    #[arg(long, default_value_t = 10)]
    pub max_length: usize,

    /// Checkpoint iteration to load (defaults to the latest when resuming or chatting)
    #[arg(long)]
    pub checkpoint_iter: Option<usize>,

    /// Run on the NdArray CPU backend instead of WGPU
    #[arg(long)]
    pub cpu: bool,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Dropout probability between GRU layers and on decoder embeddings
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Words seen fewer times than this are trimmed from the vocabulary
    #[arg(long, default_value_t = 3)]
    pub min_count: usize,

    /// Gradient norm clipping threshold
    #[arg(long, default_value_t = 50.0)]
    pub clip: f64,

    /// Probability that an iteration feeds the true previous word
    #[arg(long, default_value_t = 1.0)]
    pub teacher_forcing_ratio: f64,

    #[arg(long, default_value_t = 1e-4)]
    pub learning_rate: f64,

    /// Decoder learning rate = learning_rate × this
    #[arg(long, default_value_t = 5.0)]
    pub decoder_learning_ratio: f64,

    #[arg(long, default_value_t = 4000)]
    pub n_iteration: usize,

    #[arg(long, default_value_t = 1)]
    pub print_every: usize,

    #[arg(long, default_value_t = 500)]
    pub save_every: usize,

    /// Seed for weight init, batch sampling and teacher forcing draws
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Continue from the latest checkpoint of this run
    #[arg(long)]
    pub resume: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus_dir:             a.model.corpus_dir,
            save_dir:               a.model.save_dir,
            model_name:             a.model.model_name,
            attention:              a.model.attention,
            hidden_size:            a.model.hidden_size,
            encoder_n_layers:       a.model.encoder_n_layers,
            decoder_n_layers:       a.model.decoder_n_layers,
            dropout:                a.dropout,
            batch_size:             a.batch_size,
            max_length:             a.model.max_length,
            min_count:              a.min_count,
            clip:                   a.clip,
            teacher_forcing_ratio:  a.teacher_forcing_ratio,
            learning_rate:          a.learning_rate,
            decoder_learning_ratio: a.decoder_learning_ratio,
            n_iteration:            a.n_iteration,
            print_every:            a.print_every,
            save_every:             a.save_every,
            seed:                   a.seed,
            checkpoint_iter:        a.model.checkpoint_iter,
            resume:                 a.resume,
            cpu:                    a.model.cpu,
        }
    }
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub model: ModelArgs,
}

impl From<ChatArgs> for ChatConfig {
    fn from(a: ChatArgs) -> Self {
        ChatConfig {
            corpus_dir:       a.model.corpus_dir,
            save_dir:         a.model.save_dir,
            model_name:       a.model.model_name,
            attention:        a.model.attention,
            hidden_size:      a.model.hidden_size,
            encoder_n_layers: a.model.encoder_n_layers,
            decoder_n_layers: a.model.decoder_n_layers,
            max_length:       a.model.max_length,
            checkpoint_iter:  a.model.checkpoint_iter,
            cpu:              a.model.cpu,
        }
    }
}
