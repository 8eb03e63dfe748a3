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
        utils::{
            emphasized,
            has_furigana,
            KanaCheck,
        },
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

pub const NOTE_MODEL: &str = "Kaishi Alt Vocab";

const STAGES: &[Stage] =
    &[Stage::Reading, Stage::Classification, Stage::Examples, Stage::ExampleReading];

const EXTRACT_INSTRUCTIONS: &str = r#"
You are a Japanese vocabulary extraction system. Extract and analyze the vocabulary items of the given Japanese text:

1. Read the input text carefully.
2. Identify standalone Japanese vocabulary items, set phrases, and phrase patterns.
3. For each item:
   a. Use its dictionary form.
   b. Replace numbers with "〜" if the item usually forms compounds with numbers.
   c. Give its reading in hiragana.
   d. Give 1-3 common, simple English translations.
   e. Write it with kanji if it is commonly written that way, even if the input uses hiragana.

Output one item per line, in this format:

[Item in Japanese]:[Reading in hiragana]:[1-3 common English translations]

Example output:

食べる:たべる:to eat
お願いします:おねがいします:please
〜年前:〜ねんまえ:~ years ago
"#;

const READING_INSTRUCTIONS: &str = r#"
For each given Japanese word/pattern/phrase output its furigana in the format <word>[<furigana>].
Examples: "彼女[かのじょ]", "長[なが]い", "お好[この]み 焼[や]き".
- If the word has no kanji, output the word itself.
- Do not output furigana for katakana-only or hiragana-only words, output the word itself.
- Separate a kanji with furigana from the previous character with a space, like "お好[この]み 焼[や]き".

Each line must be formatted as `<word>:<furigana>`. Example: `彼女:彼女[かのじょ]`.
"#;

const CLASSIFICATION_INSTRUCTIONS: &str = r#"
For each given Japanese word/pattern/phrase, output:
- for a verb: "verb", whether it is "group 1", "group 2" or "group 3", and whether it is "transitive" or "intransitive", in that order
- for an adjective: whether it is an "i-adjective" or a "na-adjective"
- otherwise: its part of speech, lowercased

Each line must be formatted as `<word>:<information>`. Example: `出す:verb, group 1, transitive`.
"#;

const EXAMPLES_INSTRUCTIONS: &str = r#"
For each given Japanese word/pattern/phrase, output a simple, short, realistic example sentence in Japanese and its English translation.
- Use polite form.
- Highlight the word in both the sentence and the translation with a <b></b> tag, like "<b>彼女</b>" or "<b>she</b>".
- Do not end the sentence with a period.

The English translation in parentheses is only there to disambiguate the meaning.
Each line must be formatted as `<word>:<sentence>:<sentence translation>`. Example: `電話:母と<b>電話</b>で話しました:I spoke with my mother on the <b>phone</b>`.
"#;

const EXAMPLE_READING_INSTRUCTIONS: &str = r#"
For each given Japanese sentence, output furigana for its words in this format: "彼女[かのじょ]の 髪[かみ]はとても<b>長[なが]い</b>".
- Output furigana for **all** words in the sentence that contain at least one kanji.
- Separate a kanji with furigana from the previous character with a space, like "お好[この]み 焼[や]き" or "彼女[かのじょ]の 髪[かみ]".
- Do not put a space before the <b> tag.
- If a word is highlighted with the <b> tag, put its furigana inside the tag, like "<b>長[なが]い</b>".
- For a compound word, output furigana for the whole compound, like "食[た]べ始[はじ]める".
- If a word mixes kanji and hiragana, output furigana for the kanji only.
- Do not output furigana for katakana.

Each line must be formatted as `<word>:<sentence furigana>`. Example: `電話:母[はは]と<b>電[でん] 話[わ]</b>で 話[はな]しました`.
"#;

fn extraction_input(text: &str) -> String {
    format!(
        "Here is the Japanese input you need to process:\n\n<japanese_input>\n{}\n</japanese_input>\n\nBegin processing the Japanese input now.",
        text
    )
}

fn prompt_lines<F>(words: &WordSet, line: F) -> String
where
    F: Fn(&WordRecord) -> String,
{
    words.iter().map(line).collect::<Vec<_>>().join("\n")
}

/// Source-script processor: Japanese text in, Kaishi-style vocab notes out.
pub struct JapaneseProcessor {
    settings: GenerationSettings,
}

impl JapaneseProcessor {
    pub fn new(settings: GenerationSettings) -> Self {
        Self { settings }
    }

    async fn annotate_readings(
        &self,
        backend: &dyn ModelBackend,
        words: &mut WordSet,
    ) -> Result<(), YomicardError> {
        let input = prompt_lines(words, |w| format!("{}:{}", w.word(), field(&w.reading)));
        let request = CompletionRequest::new(&self.settings, READING_INSTRUCTIONS, input);
        let text = generate(backend, Stage::Reading, &request).await?;
        let lines = parse_enrichment(&text, 2, words, Stage::Reading, LinePolicy::Strict)?;

        apply(words, lines, |record, fields| {
            let ruby = fields.into_iter().next().unwrap_or_default();
            if record.word().has_kanji() && !has_furigana(&ruby) {
                warn!("furigana for \"{}\" has no readings: \"{}\"", record.word(), ruby);
            }
            record.ruby = Some(ruby);
        });
        Ok(())
    }

    async fn classify(
        &self,
        backend: &dyn ModelBackend,
        words: &mut WordSet,
    ) -> Result<(), YomicardError> {
        let input = prompt_lines(words, |w| w.word().to_string());
        let request = CompletionRequest::new(&self.settings, CLASSIFICATION_INSTRUCTIONS, input);
        let text = generate(backend, Stage::Classification, &request).await?;
        let lines = parse_enrichment(&text, 2, words, Stage::Classification, LinePolicy::Strict)?;

        apply(words, lines, |record, fields| {
            record.part_of_speech = fields.into_iter().next();
        });
        Ok(())
    }

    async fn generate_examples(
        &self,
        backend: &dyn ModelBackend,
        words: &mut WordSet,
    ) -> Result<(), YomicardError> {
        let input = prompt_lines(words, WordRecord::with_meaning);
        let request = CompletionRequest::new(&self.settings, EXAMPLES_INSTRUCTIONS, input);
        let text = generate(backend, Stage::Examples, &request).await?;
        let lines = parse_enrichment(&text, 3, words, Stage::Examples, LinePolicy::Strict)?;

        apply(words, lines, |record, fields| {
            let mut fields = fields.into_iter();
            record.sentence = fields.next();
            record.sentence_meaning = fields.next();
            if record.sentence.as_deref().and_then(emphasized).is_none() {
                warn!("example for \"{}\" doesn't highlight the word", record.word());
            }
        });
        Ok(())
    }

    /// Best effort: a card without sentence furigana is still usable.
    async fn annotate_examples(
        &self,
        backend: &dyn ModelBackend,
        words: &mut WordSet,
    ) -> Result<(), YomicardError> {
        let input = prompt_lines(words, |w| format!("{}:{}", w.word(), field(&w.sentence)));
        let request = CompletionRequest::new(&self.settings, EXAMPLE_READING_INSTRUCTIONS, input);
        let text = generate(backend, Stage::ExampleReading, &request).await?;
        let lines =
            parse_enrichment(&text, 2, words, Stage::ExampleReading, LinePolicy::Lenient)?;

        if lines.len() < words.len() {
            warn!(
                "{}: got furigana for {} of {} sentences",
                Stage::ExampleReading,
                lines.len(),
                words.len()
            );
        }

        apply(words, lines, |record, fields| {
            record.sentence_ruby = fields.into_iter().next();
        });
        Ok(())
    }
}

#[async_trait]
impl LanguageProcessor for JapaneseProcessor {
    fn language(&self) -> Language {
        Language::Japanese
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
                record.reading = fields.next();
                record.meaning = fields.next();
                record
            })
            .collect::<Vec<_>>();

        for record in &records {
            let reading = field(&record.reading);
            if !reading.is_reading() {
                warn!("reading for \"{}\" is not kana: \"{}\"", record.word(), reading);
            }
        }

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
            Stage::Reading => self.annotate_readings(backend, words).await,
            Stage::Classification => self.classify(backend, words).await,
            Stage::Examples => self.generate_examples(backend, words).await,
            Stage::ExampleReading => self.annotate_examples(backend, words).await,
            other => Err(YomicardError::Custom(format!("{} is not a Japanese stage", other))),
        }
    }

    fn note_fields(&self, record: &WordRecord) -> NoteFields {
        named(&[
            ("Word", record.word().to_string()),
            ("Word Meaning", field(&record.meaning)),
            ("Word Reading", field(&record.reading)),
            ("Word Furigana", field(&record.ruby)),
            ("Sentence", field(&record.sentence)),
            ("Sentence Meaning", field(&record.sentence_meaning)),
            ("Sentence Furigana", field(&record.sentence_ruby)),
            ("Notes", field(&record.part_of_speech)),
            ("Kanji Meaning", String::new()),
        ])
    }

    fn note_model(&self) -> &str {
        NOTE_MODEL
    }
}
