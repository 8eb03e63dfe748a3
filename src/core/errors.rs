use std::fmt;

use thiserror::Error;

/// One enrichment step, in the order the pipeline runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extraction,
    Reading,
    Classification,
    Examples,
    ExampleReading,
    Usage,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extraction => "word extraction",
            Stage::Reading => "furigana",
            Stage::Classification => "word info",
            Stage::Examples => "example sentences",
            Stage::ExampleReading => "example sentence furigana",
            Stage::Usage => "examples and usage notes",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum GenerationError {
    #[error("{stage}: empty response from model")]
    EmptyResponse { stage: Stage },

    #[error("{stage}: invalid lines: {}", quote_lines(.lines))]
    MalformedLine { stage: Stage, lines: Vec<String> },

    #[error("{stage}: expected {expected} lines, got {actual}")]
    CountMismatch { stage: Stage, expected: usize, actual: usize },

    #[error("{stage}: reference to unknown word \"{word}\"")]
    UnknownWordReference { stage: Stage, word: String },

    #[error("{stage}: no line for word \"{word}\"")]
    MissingWord { stage: Stage, word: String },

    #[error("couldn't extract any words from the provided text")]
    NoWordsExtracted,
}

fn quote_lines(lines: &[String]) -> String {
    lines.iter().map(|line| format!("\"{line}\"")).collect::<Vec<_>>().join(", ")
}

#[derive(Error, Debug)]
pub enum YomicardError {
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("Model backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("AnkiConnect error: {0}")]
    Anki(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Editor error: {0}")]
    Editor(String),

    #[error("YomicardError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for YomicardError {
    fn from(error: std::io::Error) -> Self {
        YomicardError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for YomicardError {
    fn from(error: reqwest::Error) -> Self {
        YomicardError::Reqwest(Box::new(error))
    }
}
