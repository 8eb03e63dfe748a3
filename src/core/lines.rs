//! Parsing of the line-based response format shared by every model call.
//!
//! Each response line is `field:field:...` with a fixed number of fields per call type.
//! Enrichment responses additionally start with a word that must already be known.

use std::collections::HashSet;

use tracing::warn;

use super::{
    errors::{
        GenerationError,
        Stage,
    },
    WordSet,
};

pub const FIELD_DELIMITER: char = ':';

/// How a stage reacts to lines that don't have the expected field count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePolicy {
    /// Any malformed line fails the stage, and enrichment responses must have one line per word.
    Strict,
    /// Malformed lines are logged and skipped, no line count is enforced.
    Lenient,
}

#[derive(Debug, Default, PartialEq)]
pub struct ParsedLines {
    pub records: Vec<Vec<String>>,
    pub invalid: Vec<String>,
}

/// Splits `text` into lines of exactly `field_count` trimmed fields, the first one non-empty.
/// Blank lines are ignored.
pub fn split_fields(text: &str, field_count: usize) -> ParsedLines {
    let mut parsed = ParsedLines::default();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<String> =
            line.split(FIELD_DELIMITER).map(|field| field.trim().to_string()).collect();

        if fields.len() == field_count && !fields[0].is_empty() {
            parsed.records.push(fields);
        } else {
            parsed.invalid.push(line.to_string());
        }
    }

    parsed
}

/// Parses an extraction response. Every line must be valid: word identity is being discovered
/// here, so a broken line can't be attributed to anything.
pub fn parse_extraction(
    text: &str,
    field_count: usize,
) -> Result<Vec<Vec<String>>, GenerationError> {
    let parsed = split_fields(text, field_count);

    if !parsed.invalid.is_empty() {
        return Err(GenerationError::MalformedLine {
            stage: Stage::Extraction,
            lines: parsed.invalid,
        });
    }

    Ok(parsed.records)
}

/// Parses an enrichment response against the words it was asked about.
///
/// Returns `(word, remaining fields)` pairs. Nothing is applied here, so callers can mutate
/// the word set only once the whole response has been accepted.
pub fn parse_enrichment(
    text: &str,
    field_count: usize,
    words: &WordSet,
    stage: Stage,
    policy: LinePolicy,
) -> Result<Vec<(String, Vec<String>)>, GenerationError> {
    let parsed = split_fields(text, field_count);

    if !parsed.invalid.is_empty() {
        match policy {
            LinePolicy::Strict => {
                return Err(GenerationError::MalformedLine { stage, lines: parsed.invalid });
            }
            LinePolicy::Lenient => {
                for line in &parsed.invalid {
                    warn!("{}: skipping invalid line: \"{}\"", stage, line);
                }
            }
        }
    }

    if policy == LinePolicy::Strict && parsed.records.len() != words.len() {
        return Err(GenerationError::CountMismatch {
            stage,
            expected: words.len(),
            actual: parsed.records.len(),
        });
    }

    let lines = parsed
        .records
        .into_iter()
        .map(|mut fields| {
            let word = fields.remove(0);
            if !words.contains(&word) {
                return Err(GenerationError::UnknownWordReference { stage, word });
            }
            Ok((word, fields))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if policy == LinePolicy::Strict {
        let answered: HashSet<&str> = lines.iter().map(|(word, _)| word.as_str()).collect();
        if let Some(missing) = words.iter().find(|record| !answered.contains(record.word())) {
            return Err(GenerationError::MissingWord { stage, word: missing.word().to_string() });
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::WordRecord;

    fn words(list: &[&str]) -> WordSet {
        list.iter().map(|w| WordRecord::new(*w)).collect()
    }

    #[test]
    fn test_split_fields_trims_and_skips_blank_lines() {
        let parsed = split_fields(" 食べる : たべる :to eat\n\n猫:ねこ\n", 3);
        assert_eq!(parsed.records, vec![vec!["食べる", "たべる", "to eat"]]);
        assert_eq!(parsed.invalid, vec!["猫:ねこ".to_string()]);
    }

    #[test]
    fn test_extraction_rejects_any_malformed_line() {
        let err = parse_extraction("cat:a feline:noun\ndog:a canine", 3).unwrap_err();
        assert_eq!(
            err,
            GenerationError::MalformedLine {
                stage: Stage::Extraction,
                lines: vec!["dog:a canine".to_string()],
            }
        );
    }

    #[test]
    fn test_strict_enrichment_requires_one_line_per_word() {
        let set = words(&["猫", "犬"]);
        let err = parse_enrichment("猫:猫[ねこ]", 2, &set, Stage::Reading, LinePolicy::Strict)
            .unwrap_err();
        assert_eq!(
            err,
            GenerationError::CountMismatch { stage: Stage::Reading, expected: 2, actual: 1 }
        );
    }

    #[test]
    fn test_strict_enrichment_requires_every_word() {
        let set = words(&["猫", "犬"]);
        let err = parse_enrichment(
            "猫:noun\n猫:verb",
            2,
            &set,
            Stage::Classification,
            LinePolicy::Strict,
        )
        .unwrap_err();
        assert_eq!(
            err,
            GenerationError::MissingWord { stage: Stage::Classification, word: "犬".to_string() }
        );
    }

    #[test]
    fn test_lenient_enrichment_keeps_repeated_lines() {
        let set = words(&["猫", "犬"]);
        let parsed = parse_enrichment(
            "猫:<b>猫[ねこ]</b>です\n猫:<b>猫[ねこ]</b>だ",
            2,
            &set,
            Stage::ExampleReading,
            LinePolicy::Lenient,
        )
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].1, vec!["<b>猫[ねこ]</b>だ".to_string()]);
    }

    #[test]
    fn test_empty_surface_form_is_malformed() {
        let err = parse_extraction("猫:ねこ:cat\n:ねこ:cat", 3).unwrap_err();
        assert_eq!(
            err,
            GenerationError::MalformedLine {
                stage: Stage::Extraction,
                lines: vec![":ねこ:cat".to_string()],
            }
        );
    }

    #[test]
    fn test_strict_enrichment_rejects_malformed_line() {
        let set = words(&["猫"]);
        let err = parse_enrichment("猫", 2, &set, Stage::Classification, LinePolicy::Strict)
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedLine { .. }));
    }

    #[test]
    fn test_unknown_word_is_rejected_under_both_policies() {
        let set = words(&["猫"]);
        for policy in [LinePolicy::Strict, LinePolicy::Lenient] {
            let err =
                parse_enrichment("鳥:鳥[とり]", 2, &set, Stage::Reading, policy).unwrap_err();
            assert_eq!(
                err,
                GenerationError::UnknownWordReference {
                    stage: Stage::Reading,
                    word: "鳥".to_string()
                }
            );
        }
    }

    #[test]
    fn test_lenient_enrichment_skips_invalid_lines() {
        let set = words(&["猫", "犬"]);
        let parsed = parse_enrichment(
            "猫:<b>猫[ねこ]</b>が 好[す]きです\nbroken line",
            2,
            &set,
            Stage::ExampleReading,
            LinePolicy::Lenient,
        )
        .unwrap();
        assert_eq!(
            parsed,
            vec![("猫".to_string(), vec!["<b>猫[ねこ]</b>が 好[す]きです".to_string()])]
        );
    }
}
