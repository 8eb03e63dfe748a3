use std::collections::HashMap;

/// A vocabulary item and whatever the enrichment stages have added to it so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordRecord {
    word: String,                         // Surface form, fixed at creation
    pub meaning: Option<String>,          // Short English gloss or definition
    pub reading: Option<String>,          // Hiragana reading (Japanese only)
    pub ruby: Option<String>,             // Furigana form, e.g. 彼女[かのじょ]
    pub part_of_speech: Option<String>,   // Part of speech / inflection class
    pub sentence: Option<String>,         // Example sentence, target word in <b></b>
    pub sentence_meaning: Option<String>, // Translation of the example sentence
    pub sentence_ruby: Option<String>,    // Example sentence with furigana
    pub usage_notes: Option<String>,      // Register, collocations, nuance
}

impl WordRecord {
    pub fn new(word: impl Into<String>) -> Self {
        Self { word: word.into(), ..Default::default() }
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    /// "word (meaning)", used to disambiguate prompts.
    pub fn with_meaning(&self) -> String {
        match &self.meaning {
            Some(meaning) => format!("{} ({})", self.word, meaning),
            None => self.word.clone(),
        }
    }
}

/// Words being processed in one run, keyed by surface form, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordSet {
    records: Vec<WordRecord>,
    index: HashMap<String, usize>,
}

impl WordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record. The first record for a surface form wins; returns `false`
    /// if the surface form was already present.
    pub fn insert(&mut self, record: WordRecord) -> bool {
        if self.index.contains_key(record.word()) {
            return false;
        }
        self.index.insert(record.word().to_string(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn get(&self, word: &str) -> Option<&WordRecord> {
        self.index.get(word).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, word: &str) -> Option<&mut WordRecord> {
        match self.index.get(word) {
            Some(&i) => self.records.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WordRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<WordRecord> for WordSet {
    fn from_iter<I: IntoIterator<Item = WordRecord>>(iter: I) -> Self {
        let mut set = WordSet::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

impl<'a> IntoIterator for &'a WordSet {
    type Item = &'a WordRecord;
    type IntoIter = std::slice::Iter<'a, WordRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Named note fields in template order.
pub type NoteFields = Vec<(String, String)>;

/// A flashcard ready to be sent to the flashcard backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardNote {
    pub deck: String,
    pub model: String,
    pub fields: NoteFields,
    pub tags: Vec<String>,
}

impl FlashcardNote {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Value of the first field, which every note model uses for the word itself.
    pub fn headword(&self) -> &str {
        self.fields.first().map(|(_, value)| value.as_str()).unwrap_or_default()
    }
}
