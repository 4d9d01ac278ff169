//! Dominant-language identification for text that is about to be spoken.
//!
//! [`LanguageDetector`] works in two passes:
//!
//! 1. Count letters per Unicode script and pick the dominant script.  Most
//!    scripts map to a single language directly (Hangul → Korean, Thai →
//!    Thai, …).
//! 2. For Latin and Cyrillic text, score each candidate language by
//!    characteristic letters and common function words and pick the best.
//!
//! Text without any letters cannot be identified and yields `None`.

use std::fmt;

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Languages the detector can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Spanish,
    French,
    German,
    Italian,
    Portuguese,
    Dutch,
    Turkish,
    Russian,
    Ukrainian,
    Kazakh,
    Greek,
    Arabic,
    Hebrew,
    Hindi,
    Thai,
    Chinese,
    Japanese,
    Korean,
}

impl Language {
    /// ISO-639-1 code, also the default speech voice name.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
            Language::Italian => "it",
            Language::Portuguese => "pt",
            Language::Dutch => "nl",
            Language::Turkish => "tr",
            Language::Russian => "ru",
            Language::Ukrainian => "uk",
            Language::Kazakh => "kk",
            Language::Greek => "el",
            Language::Arabic => "ar",
            Language::Hebrew => "he",
            Language::Hindi => "hi",
            Language::Thai => "th",
            Language::Chinese => "zh",
            Language::Japanese => "ja",
            Language::Korean => "ko",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Latin,
    Cyrillic,
    Greek,
    Arabic,
    Hebrew,
    Devanagari,
    Thai,
    Han,
    Kana,
    Hangul,
}

const SCRIPTS: [Script; 10] = [
    Script::Latin,
    Script::Cyrillic,
    Script::Greek,
    Script::Arabic,
    Script::Hebrew,
    Script::Devanagari,
    Script::Thai,
    Script::Han,
    Script::Kana,
    Script::Hangul,
];

fn script_of(c: char) -> Option<Script> {
    let script = match c as u32 {
        0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F | 0x1E00..=0x1EFF => Script::Latin,
        0x0400..=0x052F => Script::Cyrillic,
        0x0370..=0x03FF | 0x1F00..=0x1FFF => Script::Greek,
        0x0590..=0x05FF => Script::Hebrew,
        0x0600..=0x06FF | 0x0750..=0x077F | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF => Script::Arabic,
        0x0900..=0x097F => Script::Devanagari,
        0x0E00..=0x0E7F => Script::Thai,
        0x3040..=0x30FF | 0x31F0..=0x31FF => Script::Kana,
        0x1100..=0x11FF | 0x3130..=0x318F | 0xAC00..=0xD7AF => Script::Hangul,
        0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF => Script::Han,
        _ => return None,
    };
    // Latin-1 symbols (×, ÷) sit inside the range above.
    if script == Script::Latin && !c.is_alphabetic() {
        return None;
    }
    Some(script)
}

// ---------------------------------------------------------------------------
// Word and letter profiles
// ---------------------------------------------------------------------------

struct Profile {
    language: Language,
    /// Letters that (nearly) only occur in this language within its script.
    letters: &'static str,
    /// Frequent short function words.
    words: &'static [&'static str],
}

static LATIN_PROFILES: &[Profile] = &[
    Profile {
        language: Language::English,
        letters: "",
        words: &[
            "the", "and", "is", "are", "of", "to", "in", "it", "you", "that", "this", "what",
            "with", "for", "was", "have", "how", "my", "your", "be", "not", "can",
        ],
    },
    Profile {
        language: Language::Spanish,
        letters: "ñ",
        words: &[
            "el", "la", "los", "las", "es", "y", "que", "de", "en", "un", "una", "por", "para",
            "con", "no", "como", "pero", "muy", "está", "qué",
        ],
    },
    Profile {
        language: Language::French,
        letters: "œç",
        words: &[
            "le", "la", "les", "est", "et", "que", "de", "des", "un", "une", "je", "vous",
            "nous", "pas", "pour", "avec", "dans", "ce", "qui", "c'est",
        ],
    },
    Profile {
        language: Language::German,
        letters: "ßäöü",
        words: &[
            "der", "die", "das", "und", "ist", "ich", "nicht", "ein", "eine", "zu", "mit",
            "sie", "wie", "auf", "für", "auch", "wir", "es",
        ],
    },
    Profile {
        language: Language::Italian,
        letters: "",
        words: &[
            "il", "lo", "gli", "della", "di", "che", "è", "e", "un", "una", "per", "non",
            "sono", "con", "come", "ma", "anche", "questo",
        ],
    },
    Profile {
        language: Language::Portuguese,
        letters: "ãõ",
        words: &[
            "o", "os", "as", "é", "e", "que", "de", "do", "da", "um", "uma", "não", "com",
            "para", "em", "por", "mais", "você",
        ],
    },
    Profile {
        language: Language::Dutch,
        letters: "",
        words: &[
            "de", "het", "een", "en", "is", "van", "ik", "niet", "dat", "je", "met", "zijn",
            "voor", "op", "wat", "ook",
        ],
    },
    Profile {
        language: Language::Turkish,
        letters: "ğış",
        words: &[
            "ve", "bir", "bu", "da", "de", "ne", "için", "ile", "çok", "ben", "sen", "var",
            "yok", "mi", "gibi",
        ],
    },
];

static CYRILLIC_PROFILES: &[Profile] = &[
    Profile {
        language: Language::Russian,
        letters: "ыэъё",
        words: &[
            "и", "в", "не", "на", "что", "я", "с", "он", "как", "это", "по", "но", "вы", "мы",
            "так", "для", "все",
        ],
    },
    Profile {
        language: Language::Ukrainian,
        letters: "їєґ",
        words: &[
            "і", "в", "не", "на", "що", "я", "з", "це", "як", "та", "але", "ви", "ми", "так",
            "для", "від",
        ],
    },
    Profile {
        language: Language::Kazakh,
        letters: "әғқңөұүһ",
        words: &[
            "және", "бұл", "мен", "сен", "бар", "жоқ", "емес", "деп", "үшін", "қалай", "бір",
            "сіз", "біз",
        ],
    },
];

/// Letter matches weigh more than word matches: one `ñ` says more than one
/// `de`.
const LETTER_WEIGHT: usize = 3;

fn score(profile: &Profile, letters: &[char], words: &[String]) -> usize {
    let letter_hits = letters
        .iter()
        .filter(|c| profile.letters.contains(**c))
        .count();
    let word_hits = words
        .iter()
        .filter(|w| profile.words.contains(&w.as_str()))
        .count();
    letter_hits * LETTER_WEIGHT + word_hits
}

/// Highest-scoring profile; ties keep the earlier entry.  `None` when no
/// profile scored at all.
fn best_profile(profiles: &[Profile], letters: &[char], words: &[String]) -> Option<Language> {
    let mut best: Option<(Language, usize)> = None;
    for profile in profiles {
        let s = score(profile, letters, words);
        if s > 0 && best.map_or(true, |(_, top)| s > top) {
            best = Some((profile.language, s));
        }
    }
    best.map(|(language, _)| language)
}

// ---------------------------------------------------------------------------
// LanguageDetector
// ---------------------------------------------------------------------------

/// Script- and keyword-based language identification.
///
/// # Example
/// ```rust
/// use houdini::voice::{Language, LanguageDetector};
///
/// let detector = LanguageDetector::new();
/// assert_eq!(detector.detect("What is the weather like today?"), Some(Language::English));
/// assert_eq!(detector.detect("12345 !!!"), None);
/// ```
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    /// Reported for Latin text that matches no profile.
    latin_fallback: Option<Language>,
}

impl LanguageDetector {
    /// Detector that falls back to English for unrecognised Latin text.
    pub fn new() -> Self {
        Self {
            latin_fallback: Some(Language::English),
        }
    }

    /// Detector that reports `None` for Latin text with no evidence.
    pub fn strict() -> Self {
        Self {
            latin_fallback: None,
        }
    }

    /// Identify the dominant language of `text`.
    pub fn detect(&self, text: &str) -> Option<Language> {
        let lowered = text.to_lowercase();

        let mut counts = [0usize; SCRIPTS.len()];
        for c in lowered.chars() {
            if let Some(script) = script_of(c) {
                if let Some(i) = SCRIPTS.iter().position(|s| *s == script) {
                    counts[i] += 1;
                }
            }
        }

        let (index, &count) = counts.iter().enumerate().max_by_key(|(_, n)| **n)?;
        if count == 0 {
            return None;
        }
        let kana_present = lowered.chars().any(|c| script_of(c) == Some(Script::Kana));

        match SCRIPTS[index] {
            Script::Greek => Some(Language::Greek),
            Script::Arabic => Some(Language::Arabic),
            Script::Hebrew => Some(Language::Hebrew),
            Script::Devanagari => Some(Language::Hindi),
            Script::Thai => Some(Language::Thai),
            Script::Hangul => Some(Language::Korean),
            Script::Kana => Some(Language::Japanese),
            // Japanese mixes kanji with kana; pure Han text is Chinese.
            Script::Han if kana_present => Some(Language::Japanese),
            Script::Han => Some(Language::Chinese),
            Script::Latin => {
                let (letters, words) = tokens(&lowered, Script::Latin);
                best_profile(LATIN_PROFILES, &letters, &words).or(self.latin_fallback)
            }
            Script::Cyrillic => {
                let (letters, words) = tokens(&lowered, Script::Cyrillic);
                Some(best_profile(CYRILLIC_PROFILES, &letters, &words).unwrap_or(Language::Russian))
            }
        }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Letters of `script` and whitespace-separated words (stripped of
/// punctuation, apostrophes kept).
fn tokens(text: &str, script: Script) -> (Vec<char>, Vec<String>) {
    let letters = text
        .chars()
        .filter(|c| script_of(*c) == Some(script))
        .collect();
    let words = text
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_string()
        })
        .filter(|w| !w.is_empty())
        .collect();
    (letters, words)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Option<Language> {
        LanguageDetector::new().detect(text)
    }

    #[test]
    fn english_sentence() {
        assert_eq!(detect("Hi there, how are you?"), Some(Language::English));
        assert_eq!(
            detect("Gravity is the force that pulls objects toward each other."),
            Some(Language::English)
        );
    }

    #[test]
    fn latin_languages() {
        assert_eq!(
            detect("El niño está en la casa con los perros"),
            Some(Language::Spanish)
        );
        assert_eq!(
            detect("Je ne sais pas ce que vous voulez dire"),
            Some(Language::French)
        );
        assert_eq!(
            detect("Ich weiß nicht, was das ist und wie es geht"),
            Some(Language::German)
        );
        assert_eq!(
            detect("Questo è il libro della mia amica, ma non lo leggo"),
            Some(Language::Italian)
        );
        assert_eq!(
            detect("Você não sabe o que é isso, mas eu sei"),
            Some(Language::Portuguese)
        );
        assert_eq!(
            detect("Ik weet niet wat het is van de man"),
            Some(Language::Dutch)
        );
        assert_eq!(
            detect("Bu akşam çok güzel bir yemek yedik ve ben çok mutluyum"),
            Some(Language::Turkish)
        );
    }

    #[test]
    fn cyrillic_languages() {
        assert_eq!(
            detect("Это очень интересный вопрос, и вы правы"),
            Some(Language::Russian)
        );
        assert_eq!(
            detect("Це дуже цікаве питання, і ви маєте рацію, їх багато"),
            Some(Language::Ukrainian)
        );
        assert_eq!(
            detect("Сәлеметсіз бе, бұл қалай жұмыс істейді?"),
            Some(Language::Kazakh)
        );
    }

    #[test]
    fn single_script_languages() {
        assert_eq!(detect("Γεια σου κόσμε"), Some(Language::Greek));
        assert_eq!(detect("مرحبا بالعالم"), Some(Language::Arabic));
        assert_eq!(detect("שלום עולם"), Some(Language::Hebrew));
        assert_eq!(detect("नमस्ते दुनिया"), Some(Language::Hindi));
        assert_eq!(detect("สวัสดีครับ"), Some(Language::Thai));
        assert_eq!(detect("안녕하세요 세계"), Some(Language::Korean));
    }

    #[test]
    fn han_with_and_without_kana() {
        assert_eq!(detect("你好，世界"), Some(Language::Chinese));
        assert_eq!(detect("今日は良い天気ですね"), Some(Language::Japanese));
        assert_eq!(detect("こんにちは"), Some(Language::Japanese));
    }

    #[test]
    fn dominant_script_wins_in_mixed_text() {
        assert_eq!(
            detect("Привет, это мой новый API сервер"),
            Some(Language::Russian)
        );
    }

    #[test]
    fn text_without_letters_is_undetected() {
        assert_eq!(detect(""), None);
        assert_eq!(detect("   "), None);
        assert_eq!(detect("12345 + 678 = ?"), None);
        assert_eq!(detect("🙂🙂🙂"), None);
    }

    #[test]
    fn strict_detector_has_no_latin_fallback() {
        assert_eq!(LanguageDetector::strict().detect("xyzzy qwrtp"), None);
        assert_eq!(LanguageDetector::new().detect("xyzzy qwrtp"), Some(Language::English));
    }

    #[test]
    fn codes_and_display() {
        assert_eq!(Language::Kazakh.code(), "kk");
        assert_eq!(Language::Chinese.to_string(), "zh");
    }
}
