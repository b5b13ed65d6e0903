use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const GIVE_MY_NAME: &str = "GiveMyName";
pub const BOOK_VACATION: &str = "BookVacation";
pub const BOOK_SICK_DAY: &str = "BookSickDay";
pub const NO_INTENT: &str = "None";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slots {
    pub name: Option<String>,
}

/// Top intent plus extracted slots for one utterance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: String,
    pub slots: Slots,
}

impl Classification {
    pub fn new(intent: impl Into<String>, name: Option<String>) -> Self {
        Self { intent: intent.into(), slots: Slots { name } }
    }

    pub fn none() -> Self {
        Self::new(NO_INTENT, None)
    }

    /// The name slot, if it holds anything other than whitespace.
    pub fn name(&self) -> Option<&str> {
        self.slots.name.as_deref().map(str::trim).filter(|name| !name.is_empty())
    }
}

#[async_trait]
pub trait IntentRecognizer: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification>;
}

const NAME_MARKERS: &[&str] =
    &["my name is ", "name is ", "i am ", "i'm ", "this is ", "call me ", "it's "];

const NOT_A_NAME: &[&str] = &[
    "a", "an", "and", "the", "i", "hi", "hello", "hey", "help", "cancel", "quit", "yes", "no",
    "ok", "thanks", "vacation", "holiday", "sick", "ill", "leave", "off", "going", "on", "not",
    "here",
];

const SICK_KEYWORDS: &[&str] = &["sick", "ill", "unwell", "flu", "fever"];
const VACATION_KEYWORDS: &[&str] = &["vacation", "holiday", "holidays", "trip"];

/// Offline recognizer built from a few phrase rules.
///
/// Names come from "my name is X" style markers, or from an utterance made
/// only of name-like words. Either way the name keeps at most
/// `max_name_words` words.
#[derive(Clone, Debug)]
pub struct KeywordRecognizer {
    max_name_words: usize,
    booking_intents: bool,
}

impl Default for KeywordRecognizer {
    fn default() -> Self {
        Self::new(2)
    }
}

impl KeywordRecognizer {
    pub fn new(max_name_words: usize) -> Self {
        Self { max_name_words: max_name_words.max(1), booking_intents: false }
    }

    /// Report `BookVacation` / `BookSickDay` instead of `GiveMyName` when the
    /// utterance also mentions the kind of leave.
    pub fn with_booking_intents(mut self, enabled: bool) -> Self {
        self.booking_intents = enabled;
        self
    }

    pub fn recognize(&self, text: &str) -> Classification {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Classification::none();
        }

        let Some(name) = self.extract_name(text.trim(), &normalized) else {
            return Classification::none();
        };

        let lowered = normalized.to_ascii_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        let intent = if !self.booking_intents {
            GIVE_MY_NAME
        } else if words.iter().any(|word| SICK_KEYWORDS.contains(word)) {
            BOOK_SICK_DAY
        } else if words.iter().any(|word| VACATION_KEYWORDS.contains(word)) {
            BOOK_VACATION
        } else {
            GIVE_MY_NAME
        };

        Classification::new(intent, Some(name))
    }

    fn extract_name(&self, text: &str, normalized: &str) -> Option<String> {
        let lowered = text.to_ascii_lowercase();

        for marker in NAME_MARKERS {
            let Some(index) = find_marker(&lowered, marker) else {
                continue;
            };
            let rest = &text[index + marker.len()..];
            let clause = rest.split(is_clause_break).next();
            let name = clause
                .unwrap_or_default()
                .split_whitespace()
                .take_while(|word| is_name_word(word))
                .take(self.max_name_words)
                .collect::<Vec<_>>()
                .join(" ");
            if !name.is_empty() {
                return Some(name);
            }
        }

        let words = normalized.split_whitespace().collect::<Vec<_>>();
        let bare_name = !words.is_empty() && words.iter().all(|word| is_name_word(word));
        bare_name.then(|| words[..words.len().min(self.max_name_words)].join(" "))
    }
}

#[async_trait]
impl IntentRecognizer for KeywordRecognizer {
    async fn classify(&self, text: &str) -> Result<Classification> {
        Ok(self.recognize(text))
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.trim_matches(is_clause_break))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_clause_break(ch: char) -> bool {
    matches!(ch, ',' | '.' | '!' | '?' | ';' | ':')
}

/// Byte offset of `marker` when it starts the text or follows a space.
fn find_marker(lowered: &str, marker: &str) -> Option<usize> {
    if lowered.starts_with(marker) {
        return Some(0);
    }
    lowered.find(&format!(" {marker}")).map(|index| index + 1)
}

fn is_name_word(word: &str) -> bool {
    let lowered = word.to_ascii_lowercase();
    word.chars().next().is_some_and(char::is_alphabetic)
        && word.chars().all(|ch| ch.is_alphabetic() || ch == '\'' || ch == '-')
        && !NOT_A_NAME.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::{
        Classification, IntentRecognizer, KeywordRecognizer, BOOK_SICK_DAY, BOOK_VACATION,
        GIVE_MY_NAME, NO_INTENT,
    };

    #[test]
    fn marker_phrases_extract_name() {
        let recognizer = KeywordRecognizer::default();

        let classification = recognizer.recognize("Hi, my name is Alice Smith.");
        assert_eq!(classification.intent, GIVE_MY_NAME);
        assert_eq!(classification.name(), Some("Alice Smith"));

        assert_eq!(recognizer.recognize("I'm Bob").name(), Some("Bob"));
        assert_eq!(recognizer.recognize("this is Kamrooz, hello").name(), Some("Kamrooz"));
    }

    #[test]
    fn bare_words_are_treated_as_name() {
        let recognizer = KeywordRecognizer::default();

        assert_eq!(recognizer.recognize("Alice").name(), Some("Alice"));
        assert_eq!(recognizer.recognize("Mary-Jane O'Neil").name(), Some("Mary-Jane O'Neil"));
        assert_eq!(recognizer.recognize("I want to book a vacation").intent, NO_INTENT);
    }

    #[test]
    fn blank_and_numeric_input_has_no_name() {
        let recognizer = KeywordRecognizer::default();

        assert_eq!(recognizer.recognize("   "), Classification::none());
        assert_eq!(recognizer.recognize("12345").name(), None);
        assert_eq!(recognizer.recognize("hello").name(), None);
    }

    #[test]
    fn name_length_is_capped() {
        let recognizer = KeywordRecognizer::new(1);

        assert_eq!(recognizer.recognize("my name is Alice Smith").name(), Some("Alice"));
        assert_eq!(recognizer.recognize("Alice Smith").name(), Some("Alice"));

        let two_words = KeywordRecognizer::default();
        assert_eq!(
            two_words.recognize("Alice Mary Smith").name(),
            two_words.recognize("my name is Alice Mary Smith").name()
        );
        assert_eq!(two_words.recognize("Alice Mary Smith").name(), Some("Alice Mary"));
    }

    #[test]
    fn booking_intents_are_opt_in() {
        let plain = KeywordRecognizer::default();
        let booking = KeywordRecognizer::default().with_booking_intents(true);
        let text = "I'm Bob and I am sick today";

        assert_eq!(plain.recognize(text).intent, GIVE_MY_NAME);
        assert_eq!(booking.recognize(text).intent, BOOK_SICK_DAY);
        assert_eq!(booking.recognize(text).name(), Some("Bob"));
        assert_eq!(booking.recognize("this is Ann, planning a vacation").intent, BOOK_VACATION);
        assert_eq!(booking.recognize("Ann").intent, GIVE_MY_NAME);
    }

    #[test]
    fn classification_name_ignores_whitespace_slot() {
        let classification = Classification::new(GIVE_MY_NAME, Some("   ".to_owned()));
        assert_eq!(classification.name(), None);
    }

    #[tokio::test]
    async fn recognizer_trait_delegates_to_rules() {
        let recognizer = KeywordRecognizer::default();
        let classification = recognizer.classify("my name is Alice").await.expect("classify");

        assert_eq!(classification.intent, GIVE_MY_NAME);
        assert_eq!(classification.name(), Some("Alice"));
    }
}
