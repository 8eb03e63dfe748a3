use std::sync::OnceLock;

use regex::Regex;
use wana_kana::{
    IsJapaneseChar,
    IsJapaneseStr,
};

fn emphasis_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<b>(.+?)</b>").expect("emphasis pattern is valid"))
}

/// The text wrapped in the first `<b></b>` pair, if any.
pub fn emphasized(sentence: &str) -> Option<&str> {
    emphasis_regex().captures(sentence).and_then(|c| c.get(1)).map(|m| m.as_str())
}

pub trait KanaCheck {
    fn has_kanji(&self) -> bool;
    fn is_reading(&self) -> bool;
}

impl KanaCheck for str {
    fn has_kanji(&self) -> bool {
        self.chars().any(|c| c.is_kanji())
    }

    /// Readings are expected to be pure kana, allowing the 〜 placeholder used for counters.
    fn is_reading(&self) -> bool {
        let stripped: String = self.chars().filter(|c| *c != '〜').collect();
        !stripped.is_empty() && stripped.as_str().is_kana()
    }
}

/// Furigana notation puts the reading in brackets after each kanji run: 彼女[かのじょ].
pub fn has_furigana(text: &str) -> bool {
    text.contains('[') && text.contains(']')
}
