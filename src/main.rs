use std::{
    fs,
    io::{
        self,
        Read,
    },
    path::Path,
    process::ExitCode,
};

use clap::Parser;
use tracing::{
    error,
    info,
};
use tracing_subscriber::EnvFilter;
use yomicard::{
    anki::{
        self,
        AnkiConnect,
    },
    config::{
        prepare_input,
        AppConfig,
        Args,
        DryRun,
    },
    core::{
        FlashcardNote,
        Pipeline,
        Stage,
        WordRecord,
        WordSet,
        YomicardError,
    },
    llm::OpenAiClient,
    processors::processor_for,
    review::{
        self,
        ReviewEntry,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String, YomicardError> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

async fn run(args: Args) -> Result<(), YomicardError> {
    let config = AppConfig::from_args(&args)?;

    let text = prepare_input(&read_input(args.input_file.as_deref())?).ok_or_else(|| {
        YomicardError::Custom("provided input text is empty, nothing to process".to_string())
    })?;

    let processor = processor_for(args.language, config.generation.clone());

    let anki = match args.dry_run {
        Some(_) => None,
        None => {
            let anki = AnkiConnect::new(&config.anki_url)?;
            anki::check_ready(&anki, &args.deck, processor.note_model()).await?;
            Some(anki)
        }
    };

    let backend = OpenAiClient::new(&config.openai.api_key, &config.openai.base_url)?;
    let pipeline = Pipeline::new(&backend, &*processor);

    let extracted = pipeline.extract(&text).await?;

    if args.dry_run == Some(DryRun::Extract) {
        println!("Dry run: extracted words");
        for word in &extracted {
            println!("{} - {}", word.word(), word.meaning.as_deref().unwrap_or_default());
        }
        return Ok(());
    }

    let known = match &anki {
        Some(anki) => {
            anki::known_words(anki, &args.deck, processor.note_model(), &extracted).await
        }
        None => vec![false; extracted.len()],
    };
    let entries: Vec<ReviewEntry<'_>> = extracted
        .iter()
        .zip(known)
        .map(|(record, known)| ReviewEntry { record, known })
        .collect();

    let outcome = review::review(&entries)?;
    drop(entries);

    let total = extracted.len();
    let mut words = Pipeline::select(extracted, &outcome.keep);
    info!("Skipping {} words", total - words.len());

    if words.is_empty() {
        info!("No words to add, aborting");
        return Ok(());
    }

    if args.dry_run == Some(DryRun::Sentences) {
        pipeline.enrich_until(Stage::Examples, &mut words).await?;
        print_sentences(&words);
        return Ok(());
    }

    pipeline.enrich(&mut words).await?;
    let notes = pipeline.note_candidates(&words, &args.deck, &args.tags);

    match anki {
        Some(anki) => {
            let report = pipeline.export(&anki, &notes).await;
            println!("{}", report.summary());
        }
        None => print_notes(&notes),
    }

    Ok(())
}

fn print_sentences(words: &WordSet) {
    println!("Dry run: example sentences");
    for word in words {
        println!("{}", word.with_meaning());
        println!("  {}", example_line(word));
    }
}

fn example_line(word: &WordRecord) -> String {
    let sentence = word.sentence.as_deref().unwrap_or_default();
    match (&word.sentence_meaning, &word.usage_notes) {
        (Some(translation), _) => format!("{} ({})", sentence, translation),
        (None, Some(notes)) => format!("{}\n  {}", sentence, notes),
        (None, None) => sentence.to_string(),
    }
}

fn print_notes(notes: &[FlashcardNote]) {
    println!("Dry run: adding notes");
    for note in notes {
        println!("{} [{}]", note.headword(), note.model);
        for (name, value) in note.fields.iter().skip(1).filter(|(_, v)| !v.is_empty()) {
            println!("  {}: {}", name, value);
        }
    }
}
