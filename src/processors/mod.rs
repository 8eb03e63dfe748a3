//! Per-language extraction and enrichment.
//!
//! Both processors talk to the model the same way: one request per stage, one response line
//! per word. They differ in prompts, in which fields they fill and in the note model they target.

use std::{
    collections::HashSet,
    fmt,
    str::FromStr,
    time::Instant,
};

use async_trait::async_trait;
use tracing::info;

use crate::{
    core::{
        NoteFields,
        Stage,
        WordRecord,
        WordSet,
        YomicardError,
    },
    llm::{
        GenerationSettings,
        ModelBackend,
    },
};

pub mod english;
pub mod japanese;

pub use english::EnglishProcessor;
pub use japanese::JapaneseProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Japanese,
    English,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ja" | "jp" | "japanese" => Ok(Language::Japanese),
            "en" | "english" => Ok(Language::English),
            other => Err(format!("unsupported language \"{}\" (expected ja or en)", other)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Japanese => f.write_str("ja"),
            Language::English => f.write_str("en"),
        }
    }
}

#[async_trait]
pub trait LanguageProcessor: Send + Sync {
    fn language(&self) -> Language;

    /// One model call over the raw text. Words come back unique, in first-seen order.
    async fn extract(
        &self,
        backend: &dyn ModelBackend,
        text: &str,
    ) -> Result<Vec<WordRecord>, YomicardError>;

    /// Enrichment stages in the order they have to run.
    fn stages(&self) -> &'static [Stage];

    /// Runs one stage over every word. On error no word is touched.
    async fn enrich_stage(
        &self,
        backend: &dyn ModelBackend,
        stage: Stage,
        words: &mut WordSet,
    ) -> Result<(), YomicardError>;

    /// Runs stages in order up to and including `last`, or all of them when `last` is `None`
    /// or not one of this processor's stages. The first failure stops the run; stages already
    /// applied stay applied.
    async fn enrich_until(
        &self,
        backend: &dyn ModelBackend,
        last: Option<Stage>,
        words: &mut WordSet,
    ) -> Result<(), YomicardError> {
        for &stage in self.stages() {
            let start = Instant::now();
            info!("Generating {}...", stage);
            self.enrich_stage(backend, stage, words).await?;
            info!("Generated {} ({:.1}s)", stage, start.elapsed().as_secs_f32());

            if Some(stage) == last {
                break;
            }
        }
        Ok(())
    }

    async fn enrich(
        &self,
        backend: &dyn ModelBackend,
        words: &mut WordSet,
    ) -> Result<(), YomicardError> {
        self.enrich_until(backend, None, words).await
    }

    fn note_fields(&self, record: &WordRecord) -> NoteFields;

    fn note_model(&self) -> &str;
}

pub fn processor_for(
    language: Language,
    settings: GenerationSettings,
) -> Box<dyn LanguageProcessor> {
    match language {
        Language::Japanese => Box::new(JapaneseProcessor::new(settings)),
        Language::English => Box::new(EnglishProcessor::new(settings)),
    }
}

/// Keeps the first record for each surface form.
pub fn dedup_first_seen(records: Vec<WordRecord>) -> Vec<WordRecord> {
    let mut seen = HashSet::new();
    records.into_iter().filter(|record| seen.insert(record.word().to_string())).collect()
}

/// Writes accepted response lines into their records.
fn apply<F>(words: &mut WordSet, lines: Vec<(String, Vec<String>)>, mut set: F)
where
    F: FnMut(&mut WordRecord, Vec<String>),
{
    for (word, fields) in lines {
        if let Some(record) = words.get_mut(&word) {
            set(record, fields);
        }
    }
}

fn field(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn named(fields: &[(&str, String)]) -> NoteFields {
    fields.iter().map(|(name, value)| (name.to_string(), value.clone())).collect()
}
