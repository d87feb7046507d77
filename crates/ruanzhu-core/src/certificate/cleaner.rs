//! Noise stripping and per-field shape rules.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::Field;

use super::rules::{DATE_SHAPE, REGISTRATION_SHAPE};

/// Characters OCR leaves behind from table rules and quote marks.
const NOISE_CHARS: &[char] = &['|', '｜', '¦', '"', '“', '”', '。'];

/// Punctuation trimmed from both ends of a value.
const EDGE_PUNCTUATION: &[char] = &[',', '，', '.', '。', ':', '：', ';', '；', '、'];

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4e00}'..='\u{9fff}'
        | '\u{3400}'..='\u{4dbf}'
        | '\u{f900}'..='\u{faff}'
    )
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCTUATION.contains(&c))
}

/// Strip OCR noise from a field value.
///
/// Removes pipes and stray quote marks, trims edge punctuation, collapses
/// whitespace runs and drops spaces OCR inserts between two Chinese
/// characters.
pub fn clean_text(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !NOISE_CHARS.contains(c)).collect();
    let collapsed = WHITESPACE_RUN.replace_all(trim_edges(&stripped), " ");

    let chars: Vec<char> = collapsed.chars().collect();
    let mut out = String::with_capacity(collapsed.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' && i > 0 && i + 1 < chars.len() && is_cjk(chars[i - 1]) && is_cjk(chars[i + 1]) {
            continue;
        }
        out.push(c);
    }

    trim_edges(&out).to_string()
}

fn compact(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Clean a raw field value and enforce the field's shape rule.
///
/// Returns `None` when nothing usable is left; a value that fails its
/// shape check is treated as unresolved, never kept as-is.
pub fn normalize_field(field: Field, raw: &str) -> Option<String> {
    let cleaned = clean_text(raw);

    let value = match field {
        Field::Serial => cleaned.chars().filter(|c| c.is_ascii_digit()).collect(),
        Field::FirstPublicationDate => {
            let value = compact(&cleaned);
            if !DATE_SHAPE.is_match(&value) {
                return None;
            }
            value
        }
        Field::RegistrationNumber => {
            let value = compact(&cleaned).to_uppercase();
            if !REGISTRATION_SHAPE.is_match(&value) {
                return None;
            }
            value
        }
        Field::CopyrightOwner
        | Field::SoftwareName
        | Field::AcquisitionMethod
        | Field::RightsScope => cleaned,
    };

    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_pipes_and_fullwidth_space() {
        assert_eq!(clean_text("微浮窗｜｜管理系统　"), "微浮窗管理系统");
        assert_eq!(clean_text("| 某某科技有限公司 ||"), "某某科技有限公司");
    }

    #[test]
    fn test_clean_whitespace() {
        assert_eq!(clean_text("某某  科技\t有限公司"), "某某科技有限公司");
        assert_eq!(clean_text("图像识别   Toolkit  V1.0"), "图像识别 Toolkit V1.0");
        assert_eq!(clean_text("：原始取得。"), "原始取得");
    }

    #[test]
    fn test_clean_keeps_inner_punctuation() {
        assert_eq!(clean_text("“星河”数据平台"), "星河数据平台");
        assert_eq!(clean_text("某某（北京）科技有限公司"), "某某（北京）科技有限公司");
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(
            normalize_field(Field::FirstPublicationDate, "未 发表").as_deref(),
            Some("未发表")
        );
        assert_eq!(
            normalize_field(Field::FirstPublicationDate, "2021 年 3 月 15 日").as_deref(),
            Some("2021年3月15日")
        );
        assert_eq!(normalize_field(Field::FirstPublicationDate, "2021年3月"), None);
    }

    #[test]
    fn test_normalize_registration_shape() {
        assert_eq!(
            normalize_field(Field::RegistrationNumber, "2021 sr 123456").as_deref(),
            Some("2021SR123456")
        );
        assert_eq!(normalize_field(Field::RegistrationNumber, "2021SR12345"), None);
        assert_eq!(normalize_field(Field::RegistrationNumber, "2021SR1234567"), None);
    }

    #[test]
    fn test_normalize_serial_and_empty() {
        assert_eq!(normalize_field(Field::Serial, "No. 0012345").as_deref(), Some("0012345"));
        assert_eq!(normalize_field(Field::SoftwareName, " ｜｜ "), None);
        assert_eq!(normalize_field(Field::RightsScope, "全部 权利").as_deref(), Some("全部权利"));
    }
}
