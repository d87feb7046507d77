//! Software-copyright certificate field extraction.

pub mod cleaner;
pub mod fallback;
mod parser;
pub mod rules;

pub use cleaner::{clean_text, normalize_field};
pub use fallback::{name_from_filename, needs_fallback};
pub use parser::{join_pages, page_delimiter, split_pages, CertificateParser};
pub use rules::{CorrectionTable, ExtractionRule, RuleSet};

/// Software names shorter than this many characters trigger the filename
/// fallback.
pub const MIN_SOFTWARE_NAME_CHARS: usize = 4;
