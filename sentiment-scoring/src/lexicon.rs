//! Sentiment lexicons shared by the lexical model and the adjustment stages
//!
//! Valences use the VADER scale (roughly -4.0 to +4.0). The financial table
//! is merged over the general one, so finance-specific readings win on
//! conflict ("bull", "short", "crush", ...).

use std::collections::{HashMap, HashSet};

/// General-purpose word valences
const BASE_LEXICON: &[(&str, f64)] = &[
    ("good", 1.9), ("great", 3.1), ("excellent", 3.2), ("amazing", 2.8), ("awesome", 3.1),
    ("fantastic", 2.6), ("wonderful", 2.7), ("love", 3.2), ("loved", 2.9), ("like", 1.5),
    ("happy", 2.7), ("glad", 2.0), ("nice", 1.8), ("best", 3.2), ("better", 1.9),
    ("win", 2.8), ("winning", 2.4), ("won", 2.7), ("success", 2.7), ("successful", 2.8),
    ("impressive", 2.3), ("strong", 2.3), ("solid", 1.8), ("positive", 2.6), ("optimistic", 1.9),
    ("confident", 2.2), ("hope", 1.9), ("hopeful", 1.9), ("promising", 1.7), ("encouraging", 2.4),
    ("beautiful", 2.9), ("brilliant", 2.8), ("perfect", 2.7), ("thrilled", 2.7), ("excited", 1.4),
    ("exciting", 2.2), ("safe", 1.9), ("secure", 1.4), ("fine", 0.8), ("ok", 0.9),
    ("okay", 0.9), ("thanks", 1.9), ("thank", 1.5), ("lol", 1.8), ("haha", 2.0),
    ("yes", 1.7), ("agree", 1.5), ("benefit", 1.6), ("improve", 1.9), ("improved", 2.1),
    ("improving", 1.8), ("growth", 1.6), ("grow", 1.3), ("growing", 1.3), ("gain", 2.0),
    ("gains", 1.8), ("profit", 1.9), ("profits", 1.9), ("profitable", 2.2), ("rich", 2.6),
    ("bad", -2.5), ("terrible", -2.1), ("awful", -2.0), ("horrible", -2.5), ("worst", -3.1),
    ("worse", -2.1), ("hate", -2.7), ("hated", -3.2), ("sad", -2.1), ("angry", -2.3),
    ("disappointed", -1.9), ("disappointing", -2.2), ("disappointment", -2.3), ("poor", -2.1), ("weak", -1.9),
    ("fail", -2.5), ("failed", -2.3), ("failure", -2.3), ("fails", -1.8), ("lose", -1.3),
    ("losing", -1.6), ("lost", -1.3), ("loss", -1.3), ("losses", -1.7), ("fear", -2.2),
    ("afraid", -2.0), ("worried", -1.2), ("worry", -1.9), ("panic", -2.3), ("scared", -2.2),
    ("risk", -1.1), ("risky", -1.4), ("danger", -2.4), ("dangerous", -2.1), ("crisis", -3.1),
    ("disaster", -3.1), ("ugly", -2.3), ("stupid", -2.4), ("dumb", -2.3), ("scam", -2.7),
    ("fraud", -2.8), ("lie", -1.6), ("lies", -1.8), ("problem", -1.7), ("problems", -1.7),
    ("trouble", -1.7), ("concern", -1.0), ("concerns", -1.2), ("concerned", -1.3), ("doubt", -1.5),
    ("uncertain", -1.2), ("uncertainty", -1.4), ("crushed", -1.8), ("sucks", -1.5), ("wtf", -2.8),
    ("ugh", -1.8), ("rip", -1.7), ("kill", -3.7), ("killed", -3.5), ("dead", -3.3),
    ("broke", -1.8), ("broken", -2.1), ("collapse", -2.2), ("collapsed", -2.6), ("wreck", -1.9),
];

/// Finance- and trading-specific readings, merged over the base table
const FINANCIAL_LEXICON: &[(&str, f64)] = &[
    ("bullish", 2.9), ("bull", 1.5), ("bulls", 1.3), ("bearish", -2.9), ("bear", -1.5),
    ("bears", -1.3), ("rally", 2.3), ("rallies", 2.3), ("rallying", 2.3), ("surge", 2.4),
    ("surges", 2.4), ("surged", 2.4), ("soar", 2.6), ("soars", 2.6), ("soared", 2.6),
    ("skyrocket", 3.0), ("skyrockets", 3.0), ("breakout", 2.0), ("outperform", 2.2), ("outperforms", 2.2),
    ("upgrade", 2.0), ("upgraded", 2.0), ("beat", 1.9), ("beats", 1.9), ("exceeded", 1.9),
    ("exceeds", 1.9), ("record", 1.2), ("rebound", 1.7), ("recovery", 1.7), ("dividend", 0.8),
    ("buyback", 1.3), ("upside", 1.6), ("undervalued", 1.4), ("long", 0.6), ("calls", 0.8),
    ("crush", 1.6), ("crushed", 1.2), ("plunge", -2.8), ("plunges", -2.8), ("plunged", -2.8),
    ("crash", -3.0), ("crashes", -3.0), ("crashed", -3.0), ("tank", -2.2), ("tanked", -2.4),
    ("tanking", -2.5), ("dump", -2.1), ("dumping", -2.1), ("selloff", -2.2), ("downgrade", -2.0),
    ("downgraded", -2.0), ("miss", -1.6), ("missed", -1.6), ("misses", -1.6), ("underperform", -2.0),
    ("decline", -1.6), ("declines", -1.6), ("declined", -1.6), ("drop", -1.4), ("drops", -1.4),
    ("dropped", -1.4), ("downside", -1.6), ("overvalued", -1.4), ("bankruptcy", -3.2), ("bankrupt", -3.2),
    ("default", -2.2), ("delisted", -2.8), ("dilution", -1.8), ("layoffs", -2.0), ("lawsuit", -1.9),
    ("recession", -2.4), ("bubble", -1.5), ("short", -0.6), ("puts", -0.8), ("bagholder", -2.2),
    ("bagholding", -2.2), ("rekt", -2.8), ("moon", 2.5), ("mooning", 2.8), ("tendies", 2.2),
    ("stonks", 1.2), ("hodl", 1.2), ("fud", -1.9), ("ath", 2.0),
];

/// Multi-word slang and market phrases, matched before single words
const SLANG_PHRASES: &[(&str, f64)] = &[
    ("to the moon", 3.0),
    ("diamond hands", 2.2),
    ("paper hands", -1.8),
    ("all time high", 2.4),
    ("all-time high", 2.4),
    ("record high", 2.2),
    ("short squeeze", 1.8),
    ("buy the dip", 1.5),
    ("beat expectations", 2.4),
    ("raised guidance", 2.4),
    ("rug pull", -3.2),
    ("dead cat bounce", -1.9),
    ("bag holder", -2.2),
    ("missed expectations", -2.4),
    ("guidance cut", -2.4),
    ("cut guidance", -2.4),
    ("margin call", -2.5),
    ("going to zero", -3.0),
    ("sell off", -2.2),
];

/// Emoji valences, added after token-level scoring
const EMOJI_TABLE: &[(char, f64)] = &[
    ('🚀', 1.5), ('🌙', 1.0), ('💎', 1.2), ('🙌', 1.2), ('📈', 1.6),
    ('💰', 1.4), ('🤑', 1.6), ('🔥', 1.2), ('💪', 1.3), ('🎉', 1.7),
    ('😀', 1.8), ('😃', 1.8), ('😄', 1.9), ('😁', 1.8), ('😂', 1.2),
    ('😊', 1.9), ('😍', 2.2), ('👍', 1.6), ('👏', 1.4), ('✅', 1.0),
    ('❤', 2.0), ('🐂', 1.4), ('📉', -1.6), ('💩', -1.8), ('🤡', -1.6),
    ('😭', -1.8), ('😢', -1.7), ('😡', -2.2), ('😠', -2.0), ('😱', -1.6),
    ('😰', -1.6), ('👎', -1.6), ('💀', -1.4), ('🩸', -1.5), ('🐻', -1.4),
    ('🔻', -1.2), ('❌', -1.0), ('🤮', -2.2), ('😞', -1.7), ('🥲', -0.8),
];

/// Words that flip the polarity of what follows
const NEGATIONS: &[&str] = &[
    "not", "no", "never", "neither", "nor", "nobody", "nothing", "nowhere", "none", "cannot",
    "cant", "dont", "doesnt", "didnt", "isnt", "arent", "wasnt", "werent", "wont", "wouldnt",
    "shouldnt", "couldnt", "hasnt", "havent", "hadnt", "aint", "without", "hardly", "barely",
    "scarcely",
];

/// Degree modifiers, applied as multipliers on the next polarity word
const BOOSTERS: &[(&str, f64)] = &[
    ("very", 1.3), ("extremely", 1.5), ("incredibly", 1.45), ("hugely", 1.4), ("massively", 1.4),
    ("absolutely", 1.35), ("totally", 1.3), ("really", 1.25), ("so", 1.2), ("super", 1.3),
    ("highly", 1.3), ("insanely", 1.45), ("seriously", 1.25), ("most", 1.2), ("utterly", 1.4),
    ("slightly", 0.6), ("somewhat", 0.7), ("marginally", 0.6), ("kinda", 0.75),
    ("kind of", 0.75), ("sort of", 0.75), ("a bit", 0.7), ("little", 0.7), ("fairly", 0.85),
];

/// Openers that read as enthusiastic on the surface
const ENTHUSIASTIC_OPENERS: &[&str] = &[
    "oh great",
    "just great",
    "oh wonderful",
    "just perfect",
    "oh perfect",
    "love how",
    "love that",
    "love it when",
    "yeah right",
    "thanks a lot",
    "so glad",
    "what a great",
    "wow great",
    "nothing like",
];

/// Context words that contradict an enthusiastic opener
const NEGATIVE_CONTEXT: &[&str] = &[
    "down", "red", "bagholding", "halted", "diluted", "lost", "losing", "tanked", "fired", "underwater",
    "miss", "missed", "misses",
];

/// Words at or below this valence also contradict an opener
const STRONG_NEGATIVE: f64 = -2.0;

/// Word, phrase, emoji and modifier tables used for lexical scoring.
///
/// Built once at startup and shared read-only behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Lexicon {
    words: HashMap<String, f64>,
    phrases: HashMap<String, f64>,
    emoji: HashMap<char, f64>,
    boosters: HashMap<String, f64>,
    negations: HashSet<String>,
    max_phrase_len: usize,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexicon {
    pub fn new() -> Self {
        let mut words = HashMap::new();
        for (word, valence) in BASE_LEXICON {
            words.insert(word.to_string(), *valence);
        }
        // Financial readings take precedence
        for (word, valence) in FINANCIAL_LEXICON {
            words.insert(word.to_string(), *valence);
        }

        let phrases: HashMap<String, f64> = SLANG_PHRASES
            .iter()
            .map(|(p, v)| (p.to_string(), *v))
            .collect();
        let max_phrase_len = phrases
            .keys()
            .map(|p| p.split_whitespace().count())
            .max()
            .unwrap_or(1);

        Self {
            words,
            phrases,
            emoji: EMOJI_TABLE.iter().copied().collect(),
            boosters: BOOSTERS.iter().map(|(w, f)| (w.to_string(), *f)).collect(),
            negations: NEGATIONS.iter().map(|w| w.to_string()).collect(),
            max_phrase_len,
        }
    }

    /// Merge extra word valences over the current tables
    pub fn with_overrides<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        for (word, valence) in entries {
            let word = word.into().to_lowercase();
            if word.contains(' ') {
                self.max_phrase_len = self.max_phrase_len.max(word.split_whitespace().count());
                self.phrases.insert(word, valence);
            } else {
                self.words.insert(word, valence);
            }
        }
        self
    }

    pub fn valence(&self, word: &str) -> Option<f64> {
        self.words.get(word).copied()
    }

    pub fn phrase(&self, phrase: &str) -> Option<f64> {
        self.phrases.get(phrase).copied()
    }

    pub fn max_phrase_len(&self) -> usize {
        self.max_phrase_len
    }

    pub fn emoji(&self, c: char) -> Option<f64> {
        self.emoji.get(&c).copied()
    }

    /// Multiplier for a degree modifier (single word or two-word phrase)
    pub fn booster(&self, word: &str) -> Option<f64> {
        self.boosters.get(word).copied()
    }

    pub fn is_negation(&self, word: &str) -> bool {
        self.negations.contains(word) || word.ends_with("n't")
    }

    pub fn is_negative_context(&self, word: &str) -> bool {
        NEGATIVE_CONTEXT.contains(&word) || self.valence(word).map_or(false, |v| v <= STRONG_NEGATIVE)
    }

    /// Enthusiastic opener starting the already-lowercased text or one of its clauses
    pub fn enthusiastic_opener(&self, lowered: &str) -> Option<&'static str> {
        lowered
            .split(|c: char| matches!(c, ',' | ';' | '.' | '!' | '?'))
            .flat_map(|clause| clause.split(" but "))
            .map(|clause| clause.trim_start_matches(|c: char| !c.is_alphanumeric()))
            .find_map(|clause| {
                ENTHUSIASTIC_OPENERS.iter().copied().find(|opener| {
                    clause
                        .strip_prefix(*opener)
                        .map_or(false, |rest| rest.chars().next().map_or(true, |c| !c.is_alphanumeric()))
                })
            })
    }

    /// Emoji occurrences in text with their valences, in order
    pub fn emoji_hits(&self, text: &str) -> Vec<(char, f64)> {
        text.chars()
            .filter_map(|c| self.emoji(c).map(|v| (c, v)))
            .collect()
    }
}

/// Whole-word phrase containment
pub(crate) fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(idx, _)| {
        let before_ok = haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[idx + phrase.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_financial_terms_take_precedence() {
        let lexicon = Lexicon::new();
        // "crushed" reads negative in general text but positive for earnings
        assert!(lexicon.valence("crushed").unwrap() > 0.0);
        assert!(lexicon.valence("bearish").unwrap() < 0.0);
        assert_eq!(lexicon.valence("great"), Some(3.1));
    }

    #[test]
    fn test_negation_contractions() {
        let lexicon = Lexicon::new();
        assert!(lexicon.is_negation("not"));
        assert!(lexicon.is_negation("isn't"));
        assert!(lexicon.is_negation("isnt"));
        assert!(!lexicon.is_negation("note"));
    }

    #[test]
    fn test_emoji_hits() {
        let lexicon = Lexicon::new();
        let hits = lexicon.emoji_hits("🚀🚀 to the moon 📉");
        assert_eq!(hits.len(), 3);
        assert!(hits[0].1 > 0.0);
        assert!(hits[2].1 < 0.0);
    }

    #[test]
    fn test_overrides() {
        let lexicon = Lexicon::new().with_overrides(vec![("guidance raise", 2.0), ("meh", -0.5)]);
        assert_eq!(lexicon.phrase("guidance raise"), Some(2.0));
        assert_eq!(lexicon.valence("meh"), Some(-0.5));
    }

    #[test]
    fn test_enthusiastic_opener_whole_words() {
        let lexicon = Lexicon::new();
        assert_eq!(lexicon.enthusiastic_opener("oh great, another miss"), Some("oh great"));
        assert_eq!(lexicon.enthusiastic_opener("oh greatness"), None);
    }

    #[test]
    fn test_enthusiastic_opener_anchored_to_clause_start() {
        let lexicon = Lexicon::new();
        assert_eq!(lexicon.enthusiastic_opener("earnings beat. so glad i held"), Some("so glad"));
        assert_eq!(lexicon.enthusiastic_opener("i am so glad i held"), None);
        assert_eq!(lexicon.enthusiastic_opener("guess what, nothing like a red day"), Some("nothing like"));
    }

    #[test]
    fn test_mild_negatives_are_not_negative_context() {
        let lexicon = Lexicon::new();
        for word in ["risk", "concern", "doubt", "uncertain"] {
            assert!(!lexicon.is_negative_context(word), "{}", word);
        }
        assert!(lexicon.is_negative_context("bagholding"));
        assert!(lexicon.is_negative_context("missed"));
        assert!(lexicon.is_negative_context("crash"));
    }
}
