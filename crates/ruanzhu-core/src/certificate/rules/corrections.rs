//! OCR misread correction table.
//!
//! Maps garbled tokens the engine commonly produces on these certificates to
//! the domain term that was printed. Corrections run in a single
//! left-to-right pass where each garbled token is replaced as a unit; the
//! replacement text is never rescanned. [`CorrectionTable::new`] refuses any
//! pair that could let a second pass find new work, so [`CorrectionTable::apply`]
//! is idempotent for every input.

use std::borrow::Cow;

use regex::Regex;
use tracing::debug;

use crate::error::ExtractionError;

/// Built-in garbled -> correct pairs.
pub const BUILTIN_CORRECTIONS: &[(&str, &str)] = &[
    ("基浮", "悬浮"),
    ("折又", "折叠"),
    ("钦件", "软件"),
    ("重法", "方法"),
    ("著作杈人", "著作权人"),
    ("登记亏", "登记号"),
    ("权利范国", "权利范围"),
    ("原始取淂", "原始取得"),
    ("末发表", "未发表"),
];

/// Explicit, inspectable correction mapping.
#[derive(Debug, Clone)]
pub struct CorrectionTable {
    pairs: Vec<(String, String)>,
    matcher: Option<Regex>,
}

impl CorrectionTable {
    /// Build a table from pairs, rejecting any pair that breaks idempotence.
    pub fn new<I, G, C>(pairs: I) -> Result<Self, ExtractionError>
    where
        I: IntoIterator<Item = (G, C)>,
        G: Into<String>,
        C: Into<String>,
    {
        let mut table: Vec<(String, String)> = Vec::new();
        for (garbled, correct) in pairs {
            let (garbled, correct) = (garbled.into(), correct.into());
            if let Some(existing) = table.iter().find(|(g, _)| *g == garbled) {
                if existing.1 == correct {
                    continue;
                }
                return Err(invalid(&garbled, &correct, "conflicting duplicate entry"));
            }
            table.push((garbled, correct));
        }

        check_pairs(&table)?;

        let matcher = if table.is_empty() {
            None
        } else {
            // Longest first so a longer garbled token wins at the same position
            let mut keys: Vec<&str> = table.iter().map(|(g, _)| g.as_str()).collect();
            keys.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
            let alternation = keys
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation).map_err(|e| {
                ExtractionError::InvalidCorrection {
                    garbled: alternation.clone(),
                    correct: String::new(),
                    reason: e.to_string(),
                }
            })?)
        };

        Ok(Self {
            pairs: table,
            matcher,
        })
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        // The built-in pairs are covered by tests; failure here is a programming error.
        Self::new(BUILTIN_CORRECTIONS.iter().copied())
            .unwrap_or_else(|e| panic!("built-in correction table is invalid: {}", e))
    }

    /// Extend the table with more pairs, re-validating the whole set.
    pub fn with_pairs<I, G, C>(self, extra: I) -> Result<Self, ExtractionError>
    where
        I: IntoIterator<Item = (G, C)>,
        G: Into<String>,
        C: Into<String>,
    {
        let merged = self
            .pairs
            .into_iter()
            .chain(extra.into_iter().map(|(g, c)| (g.into(), c.into())));
        Self::new(merged)
    }

    /// The pairs in insertion order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Look up the correction for a garbled token.
    pub fn get(&self, garbled: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(g, _)| g == garbled)
            .map(|(_, c)| c.as_str())
    }

    /// Apply all corrections to `text`.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let Some(matcher) = &self.matcher else {
            return Cow::Borrowed(text);
        };

        let corrected = matcher.replace_all(text, |caps: &regex::Captures<'_>| {
            let garbled = &caps[0];
            let correct = self.get(garbled).unwrap_or(garbled);
            debug!("Corrected OCR token {:?} -> {:?}", garbled, correct);
            correct.to_string()
        });
        corrected
    }
}

impl Default for CorrectionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn invalid(garbled: &str, correct: &str, reason: &str) -> ExtractionError {
    ExtractionError::InvalidCorrection {
        garbled: garbled.to_string(),
        correct: correct.to_string(),
        reason: reason.to_string(),
    }
}

/// Reject pairs whose output could be rewritten by a second pass.
///
/// After one pass, text between replacements contains no whole garbled
/// token, so a new match must overlap a replacement: lie inside it, cover
/// it entirely, or straddle one of its edges.
fn check_pairs(pairs: &[(String, String)]) -> Result<(), ExtractionError> {
    for (garbled, correct) in pairs {
        if garbled.is_empty() {
            return Err(invalid(garbled, correct, "empty garbled token"));
        }
        if garbled == correct {
            return Err(invalid(garbled, correct, "correction is a no-op"));
        }
    }

    for (key, _) in pairs {
        let chars: Vec<char> = key.chars().collect();
        for (garbled, correct) in pairs {
            if correct.contains(key.as_str()) {
                return Err(invalid(
                    garbled,
                    correct,
                    &format!("replacement contains garbled token {:?}", key),
                ));
            }
            if key.contains(correct.as_str()) {
                return Err(invalid(
                    garbled,
                    correct,
                    &format!("replacement can be completed into garbled token {:?}", key),
                ));
            }
            for split in 1..chars.len() {
                let head: String = chars[..split].iter().collect();
                let tail: String = chars[split..].iter().collect();
                if correct.ends_with(&head) || correct.starts_with(&tail) {
                    return Err(invalid(
                        garbled,
                        correct,
                        &format!("replacement can join neighbouring text into {:?}", key),
                    ));
                }
            }
        }
    }

    Ok(())
}
