//! Editor-based review of extracted words.
//!
//! The operator gets a file with one `a <word>  # <meaning>` line per word and flips the
//! action to `s` for words they don't want.

use std::{
    env,
    fs,
    io::Write,
    path::PathBuf,
    process::Command,
};

use chrono::Local;
use tracing::{
    info,
    warn,
};

use crate::core::{
    WordRecord,
    YomicardError,
};

const HEADER: &str = "# Use 'a' to include a word, 's' to skip a word\n# Text after '#' is ignored\n\n";

/// A word offered for review. `known` marks words that already have a note in the deck.
#[derive(Debug, Clone)]
pub struct ReviewEntry<'a> {
    pub record: &'a WordRecord,
    pub known: bool,
}

#[derive(Debug, Default, PartialEq)]
pub struct ReviewOutcome {
    pub keep: Vec<String>,
    pub skipped: Vec<String>,
    pub invalid: Vec<String>,
}

pub fn render(entries: &[ReviewEntry<'_>]) -> String {
    let mut out = String::from(HEADER);
    for entry in entries {
        let action = if entry.known { 's' } else { 'a' };
        let meaning = entry.record.meaning.as_deref().unwrap_or_default();
        out.push_str(&format!("{} {}  # {}", action, entry.record.word(), meaning));
        if entry.known {
            out.push_str(" (already in deck)");
        }
        out.push('\n');
    }
    out
}

pub fn parse(edited: &str) -> ReviewOutcome {
    let mut outcome = ReviewOutcome::default();

    for line in edited.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((action, rest)) = line.split_once(char::is_whitespace) else {
            outcome.invalid.push(line.to_string());
            continue;
        };
        let word = rest.split('#').next().unwrap_or_default().trim().to_string();

        match action {
            "a" if !word.is_empty() => outcome.keep.push(word),
            "s" if !word.is_empty() => outcome.skipped.push(word),
            _ => outcome.invalid.push(line.to_string()),
        }
    }

    outcome
}

/// `$EDITOR` split into program and arguments, `vi` if unset.
fn editor_command() -> Result<(String, Vec<String>), YomicardError> {
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let mut parts = editor.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| YomicardError::Editor("EDITOR is set but empty".to_string()))?;
    Ok((program, parts.collect()))
}

fn save_invalid_lines(lines: &[String]) -> Result<PathBuf, YomicardError> {
    let path = PathBuf::from(format!("invalid_lines_{}.out", Local::now().format("%d%m%Y%H%M%S")));
    fs::write(&path, lines.join("\n") + "\n")?;
    Ok(path)
}

/// Opens the word list in the operator's editor and returns their choices.
pub fn review(entries: &[ReviewEntry<'_>]) -> Result<ReviewOutcome, YomicardError> {
    let mut file = tempfile::Builder::new().prefix("yomicard-").suffix(".txt").tempfile()?;
    file.write_all(render(entries).as_bytes())?;
    file.flush()?;

    let (program, args) = editor_command()?;
    let status = Command::new(&program)
        .args(&args)
        .arg(file.path())
        .status()
        .map_err(|e| YomicardError::Editor(format!("failed to launch {}: {}", program, e)))?;

    if !status.success() {
        return Err(YomicardError::Editor(format!("{} exited with {}", program, status)));
    }

    let edited = fs::read_to_string(file.path())?;
    let outcome = parse(&edited);

    for word in &outcome.skipped {
        info!("Skipping word: {}", word);
    }

    if !outcome.invalid.is_empty() {
        for line in &outcome.invalid {
            warn!("Invalid action: {}", line);
        }
        let path = save_invalid_lines(&outcome.invalid)?;
        warn!("Invalid lines saved to {}", path.display());
    }

    Ok(outcome)
}
