//! Filename fallback for the software name.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::cleaner::clean_text;

/// Labels that show a name rule captured the label text instead of a value.
const CAPTURED_LABELS: &[&str] = &["著作权人", "软件名称", "登记号"];

lazy_static! {
    // Copy/scan markers file managers and scanners append to names. ASCII
    // markers need a separator so words ending in "scan" survive.
    static ref NOISE_SUFFIX: Regex = Regex::new(
        r"(?i)(?:[-_\s]+(?:copy|scan)|[-_\s]*(?:副本|扫描件|复印件))+$"
    ).unwrap();

    static ref COPY_COUNTER: Regex = Regex::new(r"[-_\s]*[(（]\d+[)）]$").unwrap();
}

/// Whether a cleaned software name is implausible and should be replaced.
pub fn needs_fallback(name: &str, min_chars: usize) -> bool {
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    compact.is_empty()
        || name.chars().count() < min_chars
        || CAPTURED_LABELS.iter().any(|label| compact.contains(label))
}

/// Derive a software name from a source file's base name.
///
/// Drops the extension and trailing copy/scan markers, keeping everything
/// else of the stem intact.
pub fn name_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let mut name = stem.trim().to_string();

    loop {
        let stripped = COPY_COUNTER.replace(&name, "");
        let stripped = NOISE_SUFFIX.replace(&stripped, "").trim().to_string();
        if stripped == name {
            break;
        }
        name = stripped;
    }

    let name = clean_text(&name);
    if name.is_empty() { None } else { Some(name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_fallback() {
        assert!(needs_fallback("", 4));
        assert!(needs_fallback("系统", 4));
        assert!(needs_fallback("著作权人某某科技", 4));
        assert!(needs_fallback("软 件 名 称", 4));
        assert!(!needs_fallback("悬浮窗管理系统", 4));
        assert!(!needs_fallback("系统", 2));
    }

    #[test]
    fn test_name_from_filename() {
        assert_eq!(
            name_from_filename(Path::new("/scans/某某管理系统.pdf")).as_deref(),
            Some("某某管理系统")
        );
        assert_eq!(
            name_from_filename(Path::new("cert2_设计工具V2.pdf")).as_deref(),
            Some("cert2_设计工具V2")
        );
    }

    #[test]
    fn test_name_from_filename_strips_copy_markers() {
        assert_eq!(
            name_from_filename(Path::new("某某管理系统 - 副本.png")).as_deref(),
            Some("某某管理系统")
        );
        assert_eq!(
            name_from_filename(Path::new("数据平台(1).jpg")).as_deref(),
            Some("数据平台")
        );
        assert_eq!(
            name_from_filename(Path::new("数据平台_scan（2）.jpg")).as_deref(),
            Some("数据平台")
        );
        assert_eq!(name_from_filename(Path::new("副本.pdf")), None);
    }

    #[test]
    fn test_name_from_filename_keeps_words_ending_in_markers() {
        assert_eq!(
            name_from_filename(Path::new("SmartScan.pdf")).as_deref(),
            Some("SmartScan")
        );
        assert_eq!(
            name_from_filename(Path::new("Telescan.pdf")).as_deref(),
            Some("Telescan")
        );
        assert_eq!(
            name_from_filename(Path::new("Photocopy管理系统 copy.png")).as_deref(),
            Some("Photocopy管理系统")
        );
        assert_eq!(
            name_from_filename(Path::new("SmartScan-scan.pdf")).as_deref(),
            Some("SmartScan")
        );
    }
}
