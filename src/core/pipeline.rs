use tracing::info;

use super::{
    FlashcardNote,
    GenerationError,
    Stage,
    WordRecord,
    WordSet,
    YomicardError,
};
use crate::{
    anki::{
        export_notes,
        ExportReport,
        FlashcardBackend,
    },
    llm::ModelBackend,
    processors::LanguageProcessor,
};

pub const GENERATED_TAG: &str = "generated";

/// One run: extract, let the caller pick words, enrich, build notes, export.
///
/// Holds no state of its own; the word set is passed in and out. A failure at any step
/// means starting over from extraction.
pub struct Pipeline<'a> {
    backend: &'a dyn ModelBackend,
    processor: &'a dyn LanguageProcessor,
}

impl<'a> Pipeline<'a> {
    pub fn new(backend: &'a dyn ModelBackend, processor: &'a dyn LanguageProcessor) -> Self {
        Self { backend, processor }
    }

    pub async fn extract(&self, text: &str) -> Result<Vec<WordRecord>, YomicardError> {
        info!("Extracting words...");
        let words = self.processor.extract(self.backend, text).await?;

        if words.is_empty() {
            return Err(GenerationError::NoWordsExtracted.into());
        }

        info!("Extracted {} words", words.len());
        Ok(words)
    }

    /// Builds the word set from the words the operator chose to keep, in extraction order.
    pub fn select(words: Vec<WordRecord>, keep: &[String]) -> WordSet {
        words.into_iter().filter(|w| keep.iter().any(|k| k == w.word())).collect()
    }

    /// Runs every enrichment stage of the processor, in order.
    pub async fn enrich(&self, words: &mut WordSet) -> Result<(), YomicardError> {
        self.processor.enrich(self.backend, words).await
    }

    /// Runs stages up to and including `last`. Used by dry runs that stop early.
    pub async fn enrich_until(
        &self,
        last: Stage,
        words: &mut WordSet,
    ) -> Result<(), YomicardError> {
        self.processor.enrich_until(self.backend, Some(last), words).await
    }

    pub fn note_candidates(
        &self,
        words: &WordSet,
        deck: &str,
        tags: &[String],
    ) -> Vec<FlashcardNote> {
        let tags: Vec<String> = std::iter::once(GENERATED_TAG.to_string())
            .chain(tags.iter().filter(|t| t.as_str() != GENERATED_TAG).cloned())
            .collect();

        words
            .iter()
            .map(|record| FlashcardNote {
                deck: deck.to_string(),
                model: self.processor.note_model().to_string(),
                fields: self.processor.note_fields(record),
                tags: tags.clone(),
            })
            .collect()
    }

    pub async fn export(
        &self,
        flashcards: &dyn FlashcardBackend,
        notes: &[FlashcardNote],
    ) -> ExportReport {
        info!("Adding {} notes to Anki...", notes.len());
        let report = export_notes(flashcards, notes).await;
        info!("{}", report.summary());
        report
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        core::NoteFields,
        llm::{
            CompletionRequest,
            GenerationSettings,
        },
        processors::{
            EnglishProcessor,
            JapaneseProcessor,
            Language,
        },
        testing::{
            ScriptedBackend,
            StubFlashcards,
        },
    };

    fn keep(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    /// Enriches without any model call, so tests can tell its `enrich` ran.
    struct OfflineProcessor;

    #[async_trait]
    impl LanguageProcessor for OfflineProcessor {
        fn language(&self) -> Language {
            Language::English
        }

        async fn extract(
            &self,
            _backend: &dyn ModelBackend,
            _text: &str,
        ) -> Result<Vec<WordRecord>, YomicardError> {
            Ok(Vec::new())
        }

        fn stages(&self) -> &'static [Stage] {
            &[Stage::Usage]
        }

        async fn enrich_stage(
            &self,
            backend: &dyn ModelBackend,
            _stage: Stage,
            _words: &mut WordSet,
        ) -> Result<(), YomicardError> {
            let request = CompletionRequest::new(&GenerationSettings::default(), "", String::new());
            backend.complete(&request).await?;
            Ok(())
        }

        async fn enrich(
            &self,
            _backend: &dyn ModelBackend,
            words: &mut WordSet,
        ) -> Result<(), YomicardError> {
            for word in ["猫", "犬"] {
                if let Some(record) = words.get_mut(word) {
                    record.usage_notes = Some("offline".to_string());
                }
            }
            Ok(())
        }

        fn note_fields(&self, _record: &WordRecord) -> NoteFields {
            Vec::new()
        }

        fn note_model(&self) -> &str {
            "Offline"
        }
    }

    #[tokio::test]
    async fn test_enrich_goes_through_the_processor() {
        let backend = ScriptedBackend::replying(&[]);
        let processor = OfflineProcessor;
        let pipeline = Pipeline::new(&backend, &processor);
        let mut words: WordSet = vec![WordRecord::new("猫")].into_iter().collect();

        pipeline.enrich(&mut words).await.unwrap();

        assert_eq!(backend.call_count(), 0);
        assert_eq!(words.get("猫").unwrap().usage_notes.as_deref(), Some("offline"));
    }

    #[tokio::test]
    async fn test_no_words_means_no_further_calls() {
        let backend = ScriptedBackend::new(vec![None]);
        let processor = JapaneseProcessor::new(GenerationSettings::default());
        let pipeline = Pipeline::new(&backend, &processor);

        let err = pipeline.extract("。").await.unwrap_err();

        assert!(matches!(err, YomicardError::Generation(GenerationError::EmptyResponse { .. })));
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn test_select_keeps_extraction_order() {
        let words = vec![WordRecord::new("猫"), WordRecord::new("犬"), WordRecord::new("鳥")];

        let set = Pipeline::select(words, &keep(&["鳥", "猫", "馬"]));

        let selected: Vec<&str> = set.iter().map(|w| w.word()).collect();
        assert_eq!(selected, vec!["猫", "鳥"]);
    }

    #[tokio::test]
    async fn test_full_run() {
        let backend = ScriptedBackend::replying(&[
            "猫:ねこ:cat\n好き:すき:liked",
            "猫:猫[ねこ]",
            "猫:noun",
            "猫:<b>猫</b>が好きです:I like <b>cats</b>",
            "猫:<b>猫[ねこ]</b>が 好[す]きです",
        ]);
        let processor = JapaneseProcessor::new(GenerationSettings::default());
        let pipeline = Pipeline::new(&backend, &processor);

        let extracted = pipeline.extract("猫が好きです。").await.unwrap();
        let mut words = Pipeline::select(extracted, &keep(&["猫"]));
        pipeline.enrich(&mut words).await.unwrap();
        let notes = pipeline.note_candidates(&words, "Japanese", &keep(&["news"]));

        assert_eq!(backend.call_count(), 5);
        assert_eq!(notes.len(), 1);
        let note = &notes[0];
        assert_eq!(note.deck, "Japanese");
        assert_eq!(note.model, "Kaishi Alt Vocab");
        assert_eq!(note.tags, keep(&["generated", "news"]));
        assert_eq!(note.field("Word"), Some("猫"));
        assert_eq!(note.field("Word Reading"), Some("ねこ"));
        assert_eq!(note.field("Word Furigana"), Some("猫[ねこ]"));
        assert_eq!(note.field("Notes"), Some("noun"));
        assert_eq!(note.field("Sentence"), Some("<b>猫</b>が好きです"));
        assert_eq!(note.field("Sentence Meaning"), Some("I like <b>cats</b>"));
        assert_eq!(note.field("Sentence Furigana"), Some("<b>猫[ねこ]</b>が 好[す]きです"));

        let flashcards = StubFlashcards::new();
        let report = pipeline.export(&flashcards, &notes).await;
        assert_eq!(report.summary(), "Added 1/1 notes");
    }

    #[tokio::test]
    async fn test_enrich_until_stops_after_examples() {
        let backend = ScriptedBackend::replying(&[
            "猫:猫[ねこ]",
            "猫:noun",
            "猫:<b>猫</b>が好きです:I like <b>cats</b>",
        ]);
        let processor = JapaneseProcessor::new(GenerationSettings::default());
        let pipeline = Pipeline::new(&backend, &processor);
        let mut words: WordSet = vec![WordRecord::new("猫")].into_iter().collect();

        pipeline.enrich_until(Stage::Examples, &mut words).await.unwrap();

        assert_eq!(backend.call_count(), 3);
        assert_eq!(words.get("猫").unwrap().sentence_ruby, None);
    }

    #[test]
    fn test_exported_fields_match_record() {
        let processor = EnglishProcessor::new(GenerationSettings::default());
        let backend = ScriptedBackend::replying(&[]);
        let pipeline = Pipeline::new(&backend, &processor);

        let mut record = WordRecord::new("conundrum");
        record.meaning = Some("a confusing problem".to_string());
        record.part_of_speech = Some("noun".to_string());
        record.sentence = Some("The company faced a <b>conundrum</b>.".to_string());
        let words: WordSet = vec![record.clone()].into_iter().collect();

        let notes = pipeline.note_candidates(&words, "English", &[]);

        let note = &notes[0];
        assert_eq!(note.tags, keep(&["generated"]));
        assert_eq!(note.field("Word"), Some(record.word()));
        assert_eq!(note.field("Definition"), record.meaning.as_deref());
        assert_eq!(note.field("Part of Speech"), record.part_of_speech.as_deref());
        assert_eq!(note.field("Example"), record.sentence.as_deref());
        assert_eq!(note.field("Usage Notes"), Some(""));
    }
}
