// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `prepare` — builds the formatted pair file from the corpus
//   2. `train`   — trains (or resumes) the chatbot
//   3. `chat`    — loads a checkpoint and talks on stdin/stdout
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{ChatArgs, Commands, PrepareArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "chatbot",
    version = "0.1.0",
    about = "Train a seq2seq GRU chatbot with Luong attention on movie dialogs, then chat with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args) => run_prepare(args),
            Commands::Train(args)   => run_train(args),
            Commands::Chat(args)    => run_chat(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let use_case = PrepareUseCase::new(&args.corpus_dir);
    let written  = use_case.execute()?;
    println!("Wrote {} pairs to '{}'", written, use_case.output_path().display());
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on corpus in: {}", args.model.corpus_dir);
    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete at iteration {} (last loss {:.4}).",
        summary.last_iteration, summary.last_loss
    );
    Ok(())
}

fn run_chat(args: ChatArgs) -> Result<()> {
    use crate::application::chat_use_case::ChatUseCase;

    let use_case = ChatUseCase::new(&args.into())?;
    let stdin    = std::io::stdin();
    let stdout   = std::io::stdout();
    use_case.run(stdin.lock(), stdout.lock())?;
    Ok(())
}
