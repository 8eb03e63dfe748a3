use async_trait::async_trait;
use tracing::{
    error,
    info,
    warn,
};

use crate::core::{
    FlashcardNote,
    WordRecord,
    YomicardError,
};

pub mod api;

pub use api::{
    AnkiConnect,
    ApiResponse,
};

/// Where finished notes go.
#[async_trait]
pub trait FlashcardBackend: Send + Sync {
    /// Creates one note. Transport failures are `Err`; refusals come back in the envelope.
    async fn add_note(&self, note: &FlashcardNote) -> Result<ApiResponse<u64>, YomicardError>;
}

#[async_trait]
impl FlashcardBackend for AnkiConnect {
    async fn add_note(&self, note: &FlashcardNote) -> Result<ApiResponse<u64>, YomicardError> {
        AnkiConnect::add_note(self, note).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub added: Vec<u64>,
    pub duplicates: Vec<String>,
    pub failed: Vec<String>,
    pub total: usize,
}

impl ExportReport {
    pub fn summary(&self) -> String {
        format!("Added {}/{} notes", self.added.len(), self.total)
    }
}

/// Submits notes one at a time. A failing note is logged and dropped; it never stops the batch.
pub async fn export_notes(
    backend: &dyn FlashcardBackend,
    notes: &[FlashcardNote],
) -> ExportReport {
    let mut report = ExportReport { total: notes.len(), ..Default::default() };

    for note in notes {
        let word = note.headword().to_string();

        let response = match backend.add_note(note).await {
            Ok(response) => response,
            Err(e) => {
                error!("failed to add note for \"{}\": {}", word, e);
                report.failed.push(word);
                continue;
            }
        };

        if let Some(err) = response.error {
            if err.contains("duplicate") {
                info!("skipping duplicate note for \"{}\"", word);
                report.duplicates.push(word);
            } else {
                error!("failed to add note for \"{}\": {}", word, err);
                report.failed.push(word);
            }
            continue;
        }

        match response.result {
            Some(id) => report.added.push(id),
            None => {
                warn!("failed to add note for \"{}\": unknown error", word);
                report.failed.push(word);
            }
        }
    }

    report
}

/// Fails unless AnkiConnect answers and both the deck and the note model exist.
pub async fn check_ready(anki: &AnkiConnect, deck: &str, model: &str) -> Result<(), YomicardError> {
    let version = anki.version().await.map_err(|e| {
        YomicardError::Anki(format!(
            "Anki is not running or AnkiConnect is not accessible ({e}). Start AnkiConnect and try again."
        ))
    })?;
    info!("AnkiConnect is online. Version: {}", version);

    if !anki.deck_names().await?.iter().any(|d| d == deck) {
        return Err(YomicardError::Anki(format!("deck \"{}\" does not exist", deck)));
    }

    if !anki.model_names().await?.iter().any(|m| m == model) {
        return Err(YomicardError::Anki(format!("note type \"{}\" does not exist", model)));
    }

    Ok(())
}

/// For each word, whether the deck already has a note of `model` for it. Lookup failures
/// count as "not known"; review still lets the operator decide.
pub async fn known_words(
    anki: &AnkiConnect,
    deck: &str,
    model: &str,
    words: &[WordRecord],
) -> Vec<bool> {
    let mut known = Vec::with_capacity(words.len());
    for word in words {
        let query = api::word_query(deck, word.word(), Some(model));
        match anki.find_notes(&query).await {
            Ok(ids) => known.push(!ids.is_empty()),
            Err(e) => {
                warn!("couldn't look up \"{}\" in Anki: {}", word.word(), e);
                known.push(false);
            }
        }
    }
    known
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::StubFlashcards;

    fn note(word: &str) -> FlashcardNote {
        FlashcardNote {
            deck: "Japanese".to_string(),
            model: "Kaishi Alt Vocab".to_string(),
            fields: vec![("Word".to_string(), word.to_string())],
            tags: vec!["generated".to_string()],
        }
    }

    #[tokio::test]
    async fn test_duplicate_is_skipped_and_batch_continues() {
        let notes: Vec<FlashcardNote> =
            ["猫", "犬", "鳥", "魚", "馬"].iter().map(|w| note(w)).collect();
        let backend = StubFlashcards::new().refuse("鳥", "cannot create note because it is a duplicate");

        let report = export_notes(&backend, &notes).await;

        assert_eq!(report.added.len(), 4);
        assert_eq!(report.duplicates, vec!["鳥".to_string()]);
        assert!(report.failed.is_empty());
        assert_eq!(report.summary(), "Added 4/5 notes");
        assert_eq!(backend.submitted(), vec!["猫", "犬", "鳥", "魚", "馬"]);
    }

    #[tokio::test]
    async fn test_other_errors_and_transport_failures_are_dropped() {
        let notes = vec![note("猫"), note("犬"), note("鳥")];
        let backend = StubFlashcards::new()
            .refuse("猫", "model was not found: Kaishi Alt Vocab")
            .unreachable("犬");

        let report = export_notes(&backend, &notes).await;

        assert_eq!(report.added.len(), 1);
        assert_eq!(report.failed, vec!["猫".to_string(), "犬".to_string()]);
        assert_eq!(report.summary(), "Added 1/3 notes");
    }
}
