//! Rule-based field extraction for software-copyright certificates.
//!
//! Each field owns an ordered list of [`ExtractionRule`]s. The first rule
//! that matches wins; when none match the field stays unresolved.

pub mod corrections;
pub mod patterns;

pub use corrections::{CorrectionTable, BUILTIN_CORRECTIONS};
pub use patterns::*;

use regex::{Captures, Regex};
use tracing::trace;

use crate::models::{Field, FieldCandidate};

/// How a rule turns a regex match into raw field text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Take a single capture group.
    Group(usize),
    /// Take `first`, then append `next` when it holds a wrapped continuation
    /// rather than the start of another field.
    WithContinuation { first: usize, next: usize },
}

/// A single tagged extraction rule.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    /// Stable identifier, reported on candidates.
    pub id: &'static str,
    /// Field this rule resolves.
    pub field: Field,
    /// Pattern to search for.
    pub pattern: &'static Regex,
    /// Which groups form the value.
    pub capture: Capture,
}

impl ExtractionRule {
    pub fn new(id: &'static str, field: Field, pattern: &'static Regex) -> Self {
        Self {
            id,
            field,
            pattern,
            capture: Capture::Group(1),
        }
    }

    pub fn with_capture(mut self, capture: Capture) -> Self {
        self.capture = capture;
        self
    }

    /// Apply the rule to `text`.
    pub fn apply(&self, text: &str) -> Option<FieldCandidate> {
        let caps = self.pattern.captures(text)?;
        let raw = match self.capture {
            Capture::Group(group) => caps.get(group)?.as_str().trim().to_string(),
            Capture::WithContinuation { first, next } => join_continuation(&caps, first, next)?,
        };

        if raw.is_empty() {
            return None;
        }

        Some(FieldCandidate {
            field: self.field,
            raw,
            rule_id: self.id,
        })
    }
}

fn join_continuation(caps: &Captures<'_>, first: usize, next: usize) -> Option<String> {
    let head = caps.get(first)?.as_str().trim();
    let Some(tail) = caps.get(next).map(|m| m.as_str().trim()) else {
        return Some(head.to_string());
    };

    let compact: String = tail.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() || CONTINUATION_STOP.is_match(&compact) {
        return Some(head.to_string());
    }

    Some(format!("{}{}", head, tail))
}

/// Ordered extraction rules for every field.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<ExtractionRule>,
}

impl RuleSet {
    /// Build from an explicit list. Order within a field is priority order.
    pub fn new(rules: Vec<ExtractionRule>) -> Self {
        Self { rules }
    }

    /// Default certificate rules.
    pub fn default_rules() -> Self {
        use Field::*;

        Self::new(vec![
            ExtractionRule::new("serial.no", Serial, &SERIAL_NO),
            ExtractionRule::new("serial.xuhao", Serial, &SERIAL_XUHAO),
            ExtractionRule::new("owner.inline", CopyrightOwner, &OWNER_INLINE),
            ExtractionRule::new("owner.next_line", CopyrightOwner, &OWNER_NEXT_LINE),
            ExtractionRule::new("name.inline", SoftwareName, &NAME_INLINE)
                .with_capture(Capture::WithContinuation { first: 1, next: 2 }),
            ExtractionRule::new("name.next_line", SoftwareName, &NAME_NEXT_LINE),
            ExtractionRule::new("date.labeled", FirstPublicationDate, &DATE_LABELED),
            ExtractionRule::new("date.short_label", FirstPublicationDate, &DATE_SHORT_LABEL),
            ExtractionRule::new("acquisition.inline", AcquisitionMethod, &ACQUISITION_INLINE),
            ExtractionRule::new("acquisition.keyword", AcquisitionMethod, &ACQUISITION_KEYWORD),
            ExtractionRule::new("scope.inline", RightsScope, &SCOPE_INLINE),
            ExtractionRule::new("scope.keyword", RightsScope, &SCOPE_KEYWORD),
            ExtractionRule::new("registration.labeled", RegistrationNumber, &REGISTRATION_LABELED),
            ExtractionRule::new(
                "registration.standalone",
                RegistrationNumber,
                &REGISTRATION_STANDALONE,
            ),
        ])
    }

    /// Rules for one field, in priority order.
    pub fn rules_for(&self, field: Field) -> impl Iterator<Item = &ExtractionRule> {
        self.rules.iter().filter(move |r| r.field == field)
    }

    /// Resolve one field: first matching rule wins.
    pub fn resolve(&self, field: Field, text: &str) -> Option<FieldCandidate> {
        let candidate = self.rules_for(field).find_map(|rule| rule.apply(text));
        match &candidate {
            Some(c) => trace!("{} resolved by {}: {:?}", field, c.rule_id, c.raw),
            None => trace!("{} unresolved", field),
        }
        candidate
    }

    /// Resolve every field, skipping unresolved ones.
    pub fn extract_all(&self, text: &str) -> Vec<FieldCandidate> {
        Field::ALL
            .iter()
            .filter_map(|&field| self.resolve(field, text))
            .collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::default_rules()
    }
}
