use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordListFormat {
    /// A JSON array of strings.
    Json,
    /// One word per line; blank lines and `#` comments are skipped.
    Lines,
}

impl WordListFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => WordListFormat::Json,
            _ => WordListFormat::Lines,
        }
    }
}

/// The master list of candidate words, shared by every session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let words = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_string())
            .filter(|word| !word.is_empty())
            .filter(|word| seen.insert(word.clone()))
            .collect();

        Self { words }
    }

    pub fn parse(contents: &str, format: WordListFormat) -> Result<Self> {
        match format {
            WordListFormat::Json => {
                let words: Vec<String> =
                    serde_json::from_str(contents).context("word list is not a JSON string array")?;
                Ok(Self::new(words))
            }
            WordListFormat::Lines => Ok(Self::new(
                contents
                    .lines()
                    .filter(|line| !line.trim_start().starts_with('#')),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    /// Words not yet in `used`, in list order.
    pub fn available<'a>(&'a self, used: &HashSet<String>) -> Vec<&'a str> {
        self.words
            .iter()
            .filter(|word| !used.contains(*word))
            .map(String::as_str)
            .collect()
    }

    /// Uniformly random pick among the available words.
    pub fn pick(&self, used: &HashSet<String>) -> Option<String> {
        self.available(used)
            .choose(&mut rand::thread_rng())
            .map(|word| word.to_string())
    }
}
