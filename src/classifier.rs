//! Intent Classifier
//!
//! Maps a free-text finance question to one metric intent:
//! - Runway: "what is our cash runway?"
//! - Margin: "gross margin % trend for the last 3 months"
//! - Ebitda: "EBITDA for June 2025"
//! - Opex: "break down opex by category for June 2025"
//! - Revenue: "June 2025 revenue vs budget"
//!
//! Rules are a declarative table evaluated in priority order; the first
//! matching rule wins. Anything else is an `UnknownIntent`.

use crate::error::CopilotError;
use crate::metrics::DEFAULT_MARGIN_MONTHS;
use crate::models::{month_from_name, Intent, IntentKind, Period};
use crate::Result;

/// A conjunction of keyword groups. The rule matches when every group has
/// at least one keyword appearing in the question as whole words.
#[derive(Debug, Clone, Copy)]
pub struct IntentRule {
    pub intent: IntentKind,
    pub all_of: &'static [&'static [&'static str]],
}

impl IntentRule {
    /// `question` must already be lower-cased
    pub fn matches(&self, question: &str) -> bool {
        let words = word_text(question);
        self.all_of
            .iter()
            .all(|group| group.iter().any(|kw| words.contains(&word_text(kw))))
    }
}

/// Static rule table, highest priority first
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        intent: IntentKind::Runway,
        all_of: &[&["runway"]],
    },
    IntentRule {
        intent: IntentKind::Runway,
        all_of: &[
            &["cash"],
            &["burn", "burning", "months left", "run out", "runs out", "cash last"],
        ],
    },
    IntentRule {
        intent: IntentKind::Margin,
        all_of: &[&["gross margin", "gm", "gross profit"]],
    },
    IntentRule {
        intent: IntentKind::Ebitda,
        all_of: &[&["ebitda"]],
    },
    IntentRule {
        intent: IntentKind::Opex,
        all_of: &[&[
            "opex",
            "operating expense",
            "operating expenses",
            "operating cost",
            "operating costs",
        ]],
    },
    IntentRule {
        intent: IntentKind::Revenue,
        all_of: &[
            &["revenue", "revenues", "sales"],
            &["budget", "budgeted", "plan", "planned", "target", "targets"],
        ],
    },
    IntentRule {
        intent: IntentKind::Revenue,
        all_of: &[&["vs budget", "vs. budget", "versus budget", "against budget"]],
    },
];

const NUMBER_WORDS: &[(&str, usize)] = &[
    ("one", 1), ("two", 2), ("three", 3), ("four", 4),
    ("five", 5), ("six", 6), ("seven", 7), ("eight", 8),
    ("nine", 9), ("ten", 10), ("eleven", 11), ("twelve", 12),
];

/// Intent classifier
pub struct IntentClassifier;

impl IntentClassifier {
    /// Classify a question and extract its parameters
    pub fn classify(question: &str) -> Result<Intent> {
        let normalized = normalize(question);
        let kind = Self::classify_kind(&normalized)
            .ok_or_else(|| CopilotError::UnknownIntent(question.trim().to_string()))?;

        let intent = match kind {
            IntentKind::Runway => Intent::CashRunway,
            IntentKind::Margin => Intent::GrossMarginTrend {
                last_n_months: extract_last_n_months(&normalized).unwrap_or(DEFAULT_MARGIN_MONTHS),
            },
            IntentKind::Ebitda => Intent::EbitdaProxy {
                period: extract_period(&normalized),
            },
            IntentKind::Opex => Intent::OpexBreakdown {
                period: extract_period(&normalized),
            },
            IntentKind::Revenue => Intent::RevenueVsBudget {
                period: extract_period(&normalized),
            },
        };

        Ok(intent)
    }

    /// First matching rule in priority order; `question` must be normalized
    pub fn classify_kind(question: &str) -> Option<IntentKind> {
        INTENT_RULES
            .iter()
            .find(|rule| rule.matches(question))
            .map(|rule| rule.intent)
    }
}

/// Lower-case and collapse runs of whitespace
fn normalize(question: &str) -> String {
    question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn tokens(question: &str) -> Vec<&str> {
    question
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '/'))
        .map(|t| t.trim_matches(|c: char| c == '-' || c == '/'))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Tokens joined by single spaces and padded, so `contains` on two
/// word texts only matches whole words
fn word_text(text: &str) -> String {
    format!(" {} ", tokens(text).join(" "))
}

fn parse_year(token: &str) -> Option<i32> {
    if token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}

fn parse_month_number(token: &str) -> Option<u32> {
    if (1..=2).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok().filter(|m| (1..=12).contains(m))
    } else {
        None
    }
}

/// First month/year token in the question: `june 2025`, `2025-06`, `2025/6`, `2025 06`
pub fn extract_period(question: &str) -> Option<Period> {
    let toks = tokens(question);

    for (i, tok) in toks.iter().enumerate() {
        let next = toks.get(i + 1).copied();

        if let Some(month) = month_from_name(tok) {
            if let Some(period) = next.and_then(parse_year).and_then(|y| Period::new(y, month)) {
                return Some(period);
            }
            continue;
        }

        if let Some(year) = parse_year(tok) {
            if let Some(period) = next.and_then(parse_month_number).and_then(|m| Period::new(year, m)) {
                return Some(period);
            }
            continue;
        }

        if tok.contains('-') || tok.contains('/') {
            if let Ok(period) = tok.parse::<Period>() {
                return Some(period);
            }
        }
    }

    None
}

/// `last N months` / `past N months`, with N as digits or a word up to twelve
pub fn extract_last_n_months(question: &str) -> Option<usize> {
    let toks = tokens(question);

    toks.windows(3).find_map(|w| {
        if !matches!(w[0], "last" | "past" | "trailing") || !w[2].starts_with("month") {
            return None;
        }
        w[1].parse::<usize>().ok().or_else(|| {
            NUMBER_WORDS
                .iter()
                .find(|(word, _)| *word == w[1])
                .map(|(_, n)| *n)
        })
    })
}
