//! Lexicon-based sentiment polarity.
//!
//! Valences use the -4..4 scale common to rule-based sentiment lexicons. The
//! compound score normalizes the summed valence into [-1, 1].

use std::collections::HashMap;

use crate::config::SentimentConfig;
use crate::models::SentimentPolarity;

const NEGATION_WINDOW: usize = 3;
const NEGATION_SCALAR: f64 = -0.74;
const INTENSIFIER_BOOST: f64 = 0.293;
const NORMALIZATION_ALPHA: f64 = 15.0;

const NEGATORS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "none", "cannot", "neither", "nor", "without",
];

const INTENSIFIERS: &[&str] = &[
    "very",
    "really",
    "so",
    "extremely",
    "totally",
    "completely",
    "incredibly",
    "super",
    "deeply",
];

const LEXICON: &[(&str, f64)] = &[
    ("happy", 2.7),
    ("glad", 2.0),
    ("great", 3.1),
    ("good", 1.9),
    ("calm", 1.3),
    ("hopeful", 2.3),
    ("grateful", 2.5),
    ("better", 1.9),
    ("relaxed", 1.9),
    ("proud", 2.1),
    ("love", 3.2),
    ("excited", 2.2),
    ("content", 1.5),
    ("peaceful", 2.2),
    ("joy", 2.8),
    ("okay", 0.9),
    ("fine", 0.8),
    ("energized", 1.8),
    ("motivated", 1.8),
    ("safe", 1.9),
    ("supported", 1.9),
    ("strong", 2.3),
    ("sad", -2.1),
    ("depressed", -2.3),
    ("anxious", -1.0),
    ("worried", -1.6),
    ("stressed", -1.4),
    ("overwhelmed", -1.5),
    ("lonely", -2.0),
    ("alone", -1.0),
    ("tired", -1.1),
    ("exhausted", -1.5),
    ("hopeless", -2.0),
    ("worthless", -1.9),
    ("angry", -2.3),
    ("hate", -2.7),
    ("awful", -2.0),
    ("terrible", -2.1),
    ("miserable", -2.2),
    ("hurt", -2.4),
    ("pain", -2.3),
    ("cry", -2.1),
    ("crying", -2.1),
    ("scared", -2.2),
    ("afraid", -2.0),
    ("empty", -0.9),
    ("numb", -1.0),
    ("lost", -1.3),
    ("broken", -1.9),
    ("die", -2.9),
    ("dead", -3.3),
    ("kill", -3.7),
    ("suicide", -3.5),
    ("panic", -2.3),
    ("bad", -2.5),
    ("worse", -2.1),
    ("worst", -3.1),
    ("useless", -1.8),
    ("burden", -1.5),
    ("guilty", -1.8),
    ("ashamed", -2.1),
    ("fail", -2.0),
    ("failed", -2.0),
    ("failure", -2.4),
    ("pointless", -1.7),
];

#[derive(Debug, Clone)]
pub struct SentimentScorer {
    valence: HashMap<String, f64>,
}

impl SentimentScorer {
    pub fn new(config: &SentimentConfig) -> Self {
        let mut valence: HashMap<String, f64> = LEXICON
            .iter()
            .map(|(word, value)| (word.to_string(), *value))
            .collect();

        for (word, value) in &config.valence {
            valence.insert(word.to_lowercase(), value.clamp(-4.0, 4.0));
        }

        Self { valence }
    }

    pub fn score(&self, text: &str) -> SentimentPolarity {
        let tokens = tokenize(text);
        let mut valences = Vec::new();

        for (index, token) in tokens.iter().enumerate() {
            let Some(&base) = self.valence.get(token.as_str()) else {
                continue;
            };

            let window = &tokens[index.saturating_sub(NEGATION_WINDOW)..index];
            let mut value = base;
            if window
                .last()
                .is_some_and(|previous| INTENSIFIERS.contains(&previous.as_str()))
            {
                value += INTENSIFIER_BOOST * value.signum();
            }
            if window.iter().any(|word| is_negator(word)) {
                value *= NEGATION_SCALAR;
            }
            valences.push(value);
        }

        if valences.is_empty() {
            return SentimentPolarity::default();
        }

        let sum: f64 = valences.iter().sum();
        let compound = (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0);
        let mean = (sum / valences.len() as f64 / 4.0).clamp(-1.0, 1.0);

        SentimentPolarity { compound, mean }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_negator(token: &str) -> bool {
    NEGATORS.contains(&token) || token.ends_with("n't")
}
