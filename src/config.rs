use std::{
    fmt,
    path::PathBuf,
    str::FromStr,
};

use clap::Parser;

use crate::{
    anki::api::DEFAULT_ANKICONNECT_URL,
    core::YomicardError,
    llm::{
        openai::DEFAULT_BASE_URL,
        GenerationSettings,
        DEFAULT_MAX_TOKENS,
        DEFAULT_MODEL,
    },
    processors::Language,
};

/// Where a dry run stops. Nothing is sent to Anki in any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DryRun {
    /// Print the extracted words.
    Extract,
    /// Print words with their example sentences.
    Sentences,
    /// Print the notes that would be added.
    All,
}

impl FromStr for DryRun {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extract" => Ok(DryRun::Extract),
            "sentences" => Ok(DryRun::Sentences),
            "all" => Ok(DryRun::All),
            other => Err(format!("unknown dry run \"{}\" (extract, sentences or all)", other)),
        }
    }
}

impl fmt::Display for DryRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DryRun::Extract => "extract",
            DryRun::Sentences => "sentences",
            DryRun::All => "all",
        };
        f.write_str(name)
    }
}

#[derive(Parser, Debug)]
#[command(name = "yomicard")]
#[command(about = "Extract vocabulary from a text and add it to Anki as enriched flashcards")]
pub struct Args {
    /// Text to mine; reads stdin when omitted. Lines starting with '#' are ignored
    #[arg(long)]
    pub input_file: Option<PathBuf>,

    /// Stop early and print results instead of adding notes
    #[arg(long, num_args = 0..=1, default_missing_value = "all")]
    pub dry_run: Option<DryRun>,

    /// Anki deck to add notes to
    #[arg(long)]
    pub deck: String,

    /// Language of the input text (ja or en)
    #[arg(long, default_value = "ja")]
    pub language: Language,

    /// Extra tag for every note; repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    #[arg(long, env = "YOMICARD_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    #[arg(long, env = "ANKICONNECT_URL", default_value = DEFAULT_ANKICONNECT_URL)]
    pub anki_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    pub openai_api_key: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub generation: GenerationSettings,
    pub openai: OpenAiConfig,
    pub anki_url: String,
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Result<Self, YomicardError> {
        if args.max_tokens == 0 {
            return Err(YomicardError::Config("--max-tokens must be greater than 0".to_string()));
        }
        if args.model.trim().is_empty() {
            return Err(YomicardError::Config("--model must not be empty".to_string()));
        }
        if args.deck.trim().is_empty() {
            return Err(YomicardError::Config("--deck must not be empty".to_string()));
        }

        Ok(Self {
            generation: GenerationSettings {
                model: args.model.clone(),
                max_tokens: args.max_tokens,
                temperature: 0.0,
            },
            openai: OpenAiConfig {
                api_key: args.openai_api_key.clone(),
                base_url: args.openai_base_url.clone(),
            },
            anki_url: args.anki_url.clone(),
        })
    }
}

/// Drops comment and blank lines, trims the rest.
pub fn prepare_input(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
