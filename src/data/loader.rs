// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Two jobs:
//
//   1. CornellCorpus — reads the raw Cornell Movie-Dialogs files
//      and writes one "query<TAB>response" line per exchange.
//
//      movie_lines.txt:
//        L1045 +++$+++ u0 +++$+++ m0 +++$+++ BIANCA +++$+++ They do not!
//      movie_conversations.txt:
//        u0 +++$+++ u2 +++$+++ m0 +++$+++ ['L194', 'L195', 'L196']
//
//      Every pair of consecutive lines inside a conversation
//      becomes a (query, response) pair. The files are
//      ISO-8859-1, so bytes are decoded as Latin-1.
//
//   2. FormattedPairLoader — reads the formatted file back and
//      normalises both sides. Implements PairSource.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::PairSource;

const FIELD_SEPARATOR: &str = " +++$+++ ";
const PAIR_DELIMITER: char = '\t';

/// One utterance from movie_lines.txt
#[derive(Debug, Clone)]
pub struct MovieLine {
    pub line_id:      String,
    pub character_id: String,
    pub movie_id:     String,
    pub character:    String,
    pub text:         String,
}

/// One conversation from movie_conversations.txt with its lines resolved
#[derive(Debug, Clone)]
pub struct Conversation {
    pub character1_id: String,
    pub character2_id: String,
    pub movie_id:      String,
    pub lines:         Vec<MovieLine>,
}

pub struct CornellCorpus {
    dir: PathBuf,
}

impl CornellCorpus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read movie_lines.txt into a map keyed by line ID
    pub fn load_lines(&self) -> Result<HashMap<String, MovieLine>> {
        let path    = self.dir.join("movie_lines.txt");
        let content = read_latin1(&path)?;

        let mut lines = HashMap::new();
        for raw in content.lines() {
            let values: Vec<&str> = raw.splitn(5, FIELD_SEPARATOR).collect();
            if values.len() < 5 {
                tracing::debug!("Skipping malformed movie line: {raw}");
                continue;
            }
            let line = MovieLine {
                line_id:      values[0].to_string(),
                character_id: values[1].to_string(),
                movie_id:     values[2].to_string(),
                character:    values[3].to_string(),
                text:         values[4].to_string(),
            };
            lines.insert(line.line_id.clone(), line);
        }

        tracing::info!("Loaded {} movie lines", lines.len());
        Ok(lines)
    }

    /// Read movie_conversations.txt and resolve each utterance ID.
    /// IDs that do not appear in `lines` are skipped with a warning.
    pub fn load_conversations(
        &self,
        lines: &HashMap<String, MovieLine>,
    ) -> Result<Vec<Conversation>> {
        let path    = self.dir.join("movie_conversations.txt");
        let content = read_latin1(&path)?;

        let mut conversations = Vec::new();
        for raw in content.lines() {
            let values: Vec<&str> = raw.splitn(4, FIELD_SEPARATOR).collect();
            if values.len() < 4 {
                tracing::debug!("Skipping malformed conversation: {raw}");
                continue;
            }

            let mut conversation_lines = Vec::new();
            for line_id in utterance_ids(values[3]) {
                match lines.get(&line_id) {
                    Some(line) => conversation_lines.push(line.clone()),
                    None => tracing::warn!("Conversation references unknown line {line_id}"),
                }
            }

            conversations.push(Conversation {
                character1_id: values[0].to_string(),
                character2_id: values[1].to_string(),
                movie_id:      values[2].to_string(),
                lines:         conversation_lines,
            });
        }

        tracing::info!("Loaded {} conversations", conversations.len());
        Ok(conversations)
    }

    /// Load both files and write the tab-separated pair file.
    /// Returns the number of pairs written.
    pub fn write_formatted(&self, output: &Path) -> Result<usize> {
        let lines         = self.load_lines()?;
        let conversations = self.load_conversations(&lines)?;
        let pairs         = extract_sentence_pairs(&conversations);

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        let file = fs::File::create(output)
            .with_context(|| format!("Cannot create '{}'", output.display()))?;
        let mut writer = BufWriter::new(file);
        for (query, response) in &pairs {
            writeln!(writer, "{query}{PAIR_DELIMITER}{response}")?;
        }
        writer.flush()?;

        tracing::info!("Wrote {} pairs to '{}'", pairs.len(), output.display());
        Ok(pairs.len())
    }
}

/// Pair up consecutive lines of every conversation.
/// The last line of a conversation has no answer and is dropped,
/// and pairs where either side is blank are skipped.
pub fn extract_sentence_pairs(conversations: &[Conversation]) -> Vec<(String, String)> {
    conversations
        .iter()
        .flat_map(|conversation| conversation.lines.windows(2))
        .filter_map(|window| {
            let input  = clean_field(&window[0].text);
            let target = clean_field(&window[1].text);
            (!input.is_empty() && !target.is_empty()).then_some((input, target))
        })
        .collect()
}

/// Pull every `L<digits>` token out of a Python-style list literal,
/// e.g. "['L194', 'L195']" → ["L194", "L195"].
fn utterance_ids(field: &str) -> Vec<String> {
    let bytes   = field.as_bytes();
    let mut ids = Vec::new();
    let mut i   = 0;
    while i < bytes.len() {
        if bytes[i] == b'L' {
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start + 1 {
                ids.push(field[start..i].to_string());
            }
        } else {
            i += 1;
        }
    }
    ids
}

/// Trim the line and keep the pair file's delimiter out of the text
fn clean_field(text: &str) -> String {
    text.trim().replace(PAIR_DELIMITER, " ")
}

/// ISO-8859-1 maps every byte to the code point with the same value
fn read_latin1(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(bytes.iter().map(|&b| b as char).collect())
}

// ─── FormattedPairLoader ──────────────────────────────────────────────────────
/// Reads the tab-separated file produced by `CornellCorpus::write_formatted`
/// and normalises both sides of every pair.
pub struct FormattedPairLoader {
    path:         PathBuf,
    preprocessor: Preprocessor,
}

impl FormattedPairLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path:         path.into(),
            preprocessor: Preprocessor::new(),
        }
    }
}

impl PairSource for FormattedPairLoader {
    fn load_pairs(&self) -> Result<Vec<SentencePair>> {
        tracing::info!("Reading lines from '{}'", self.path.display());
        let content = fs::read_to_string(&self.path).with_context(|| {
            format!(
                "Cannot read pair file '{}'. Run 'prepare' first.",
                self.path.display()
            )
        })?;

        let pairs: Vec<SentencePair> = content
            .trim()
            .lines()
            .filter_map(|line| line.split_once(PAIR_DELIMITER))
            .map(|(query, response)| {
                SentencePair::new(
                    self.preprocessor.normalize(query),
                    self.preprocessor.normalize(response),
                )
            })
            .collect();

        tracing::info!("Read {} sentence pairs", pairs.len());
        Ok(pairs)
    }
}
