use async_trait::async_trait;
use tracing::{
    info,
    warn,
};

use super::{
    apply,
    dedup_first_seen,
    field,
    named,
    Language,
    LanguageProcessor,
};
use crate::{
    core::{
        lines::{
            parse_enrichment,
            parse_extraction,
            LinePolicy,
        },
        utils::emphasized,
        NoteFields,
        Stage,
        WordRecord,
        WordSet,
        YomicardError,
    },
    llm::{
        generate,
        CompletionRequest,
        GenerationSettings,
        ModelBackend,
    },
};

pub const NOTE_MODEL: &str = "English Vocabulary";

const STAGES: &[Stage] = &[Stage::Usage];

const EXTRACT_INSTRUCTIONS: &str = r#"
You are an English vocabulary extraction system. Extract the advanced vocabulary items of the given English text:

1. Read the input text carefully.
2. Identify advanced or noteworthy vocabulary items that are useful for language learners.
3. For each item:
   a. Use its dictionary form.
   b. Give a clear, concise definition.
   c. Give its part of speech (noun, verb, adjective, ...).

Do not use the ":" character inside any field.
Output one item per line, in this format:

[Word]:[Definition]:[Part of Speech]

Example output:

elaborate:to explain something in greater detail:verb
diminish:to become smaller or less important:verb
tenuous:weak or uncertain:adjective
"#;

const USAGE_INSTRUCTIONS: &str = r#"
For each given English word, output a natural example sentence showing its typical use, and usage notes covering common collocations, register (formal/informal) and anything special (regional usage, idioms, nuances).
- Highlight the word in the example sentence with a <b></b> tag, like "<b>meticulous</b>".
- The definition in parentheses is only there to disambiguate the meaning.
- Do not use the ":" character inside any field.

Each line must be formatted as `<word>:<example sentence>:<usage notes>`. Example:
`meticulous:She is <b>meticulous</b> about organizing her workspace.:Common in formal and academic contexts; often collocates with "attention to detail" and "planning."`
"#;

fn extraction_input(text: &str) -> String {
    format!(
        "Here is the English input you need to process:\n\n<english_input>\n{}\n</english_input>\n\nBegin analyzing the vocabulary now.",
        text
    )
}

/// Alternate-language processor. Part of speech comes with extraction, so a single
/// enrichment stage adds the example and usage notes.
pub struct EnglishProcessor {
    settings: GenerationSettings,
}

impl EnglishProcessor {
    pub fn new(settings: GenerationSettings) -> Self {
        Self { settings }
    }

    async fn describe_usage(
        &self,
        backend: &dyn ModelBackend,
        words: &mut WordSet,
    ) -> Result<(), YomicardError> {
        let input = words.iter().map(WordRecord::with_meaning).collect::<Vec<_>>().join("\n");
        let request = CompletionRequest::new(&self.settings, USAGE_INSTRUCTIONS, input);
        let text = generate(backend, Stage::Usage, &request).await?;
        let lines = parse_enrichment(&text, 3, words, Stage::Usage, LinePolicy::Strict)?;

        apply(words, lines, |record, fields| {
            let mut fields = fields.into_iter();
            record.sentence = fields.next();
            record.usage_notes = fields.next();
            if record.sentence.as_deref().and_then(emphasized).is_none() {
                warn!("example for \"{}\" doesn't highlight the word", record.word());
            }
        });
        Ok(())
    }
}

#[async_trait]
impl LanguageProcessor for EnglishProcessor {
    fn language(&self) -> Language {
        Language::English
    }

    async fn extract(
        &self,
        backend: &dyn ModelBackend,
        text: &str,
    ) -> Result<Vec<WordRecord>, YomicardError> {
        let request =
            CompletionRequest::new(&self.settings, EXTRACT_INSTRUCTIONS, extraction_input(text));
        let response = generate(backend, Stage::Extraction, &request).await?;

        let records = parse_extraction(&response, 3)?
            .into_iter()
            .map(|fields| {
                let mut fields = fields.into_iter();
                let mut record = WordRecord::new(fields.next().unwrap_or_default());
                record.meaning = fields.next();
                record.part_of_speech = fields.next();
                record
            })
            .collect();

        let unique = dedup_first_seen(records);
        info!("Extracted {} unique words", unique.len());
        Ok(unique)
    }

    fn stages(&self) -> &'static [Stage] {
        STAGES
    }

    async fn enrich_stage(
        &self,
        backend: &dyn ModelBackend,
        stage: Stage,
        words: &mut WordSet,
    ) -> Result<(), YomicardError> {
        match stage {
            Stage::Usage => self.describe_usage(backend, words).await,
            other => Err(YomicardError::Custom(format!("{} is not an English stage", other))),
        }
    }

    fn note_fields(&self, record: &WordRecord) -> NoteFields {
        named(&[
            ("Word", record.word().to_string()),
            ("Definition", field(&record.meaning)),
            ("Part of Speech", field(&record.part_of_speech)),
            ("Example", field(&record.sentence)),
            ("Usage Notes", field(&record.usage_notes)),
        ])
    }

    fn note_model(&self) -> &str {
        NOTE_MODEL
    }
}
