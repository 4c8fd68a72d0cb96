// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Turns the raw Cornell Movie-Dialogs files into the
// tab-separated pair file that `train` reads:
//
//   movie_lines.txt + movie_conversations.txt
//     → <corpus_dir>/formatted_movie_lines.txt

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::application::train_use_case::FORMATTED_FILE;
use crate::data::loader::CornellCorpus;

pub struct PrepareUseCase {
    corpus_dir: PathBuf,
}

impl PrepareUseCase {
    pub fn new(corpus_dir: impl Into<PathBuf>) -> Self {
        Self { corpus_dir: corpus_dir.into() }
    }

    pub fn output_path(&self) -> PathBuf {
        self.corpus_dir.join(FORMATTED_FILE)
    }

    /// Returns the number of pairs written
    pub fn execute(&self) -> Result<usize> {
        tracing::info!("Processing corpus in '{}'", self.corpus_dir.display());
        let output = self.output_path();
        CornellCorpus::new(&self.corpus_dir).write_formatted(Path::new(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_writes_pairs_next_to_corpus() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("movie_lines.txt"),
            "L2 +++$+++ u1 +++$+++ m0 +++$+++ A +++$+++ Hi.\n\
             L3 +++$+++ u2 +++$+++ m0 +++$+++ B +++$+++ Hello there.\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("movie_conversations.txt"),
            "u1 +++$+++ u2 +++$+++ m0 +++$+++ ['L2', 'L3']\n",
        )
        .unwrap();

        let use_case = PrepareUseCase::new(dir.path());
        assert_eq!(use_case.execute().unwrap(), 1);

        let written = fs::read_to_string(use_case.output_path()).unwrap();
        assert_eq!(written, "Hi.\tHello there.\n");
    }
}
