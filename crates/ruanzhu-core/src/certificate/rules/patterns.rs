//! Regex patterns for software-copyright certificate extraction.
//!
//! OCR output for these certificates routinely splits labels with spaces
//! (`著 作 权 人`), so every label is built with [`spaced`], which allows
//! horizontal whitespace between characters but never a line break.

use lazy_static::lazy_static;
use regex::Regex;

/// Horizontal whitespace (no newlines).
const HS: &str = r"[^\S\n]*";

/// Separator between a label and its value.
const SEP: &str = r"[^\S\n]*[:：;；,，.]?[^\S\n]*";

/// First character of an inline value: anything but whitespace and
/// separator/noise punctuation.
const VALUE: &str = r"([^\s|｜:：;；,，][^\n]*)";

/// Junk OCR leaves after a label whose value wrapped onto the next line.
const LABEL_TAIL: &str = r"[^\S\n]*[:：;；,，|｜]*[^\S\n]*\n[^\S\n]*";

/// Build a regex fragment matching `label` with optional horizontal
/// whitespace between its characters.
pub fn spaced(label: &str) -> String {
    label
        .chars()
        .map(|c| regex::escape(&c.to_string()))
        .collect::<Vec<_>>()
        .join(HS)
}

fn inline(label: &str) -> Regex {
    Regex::new(&format!("{}{}{}", spaced(label), SEP, VALUE)).unwrap()
}

fn next_line(label: &str) -> Regex {
    Regex::new(&format!("{}{}([^\\n]+)", spaced(label), LABEL_TAIL)).unwrap()
}

fn date_value() -> String {
    format!(
        r"(\d{{4}}{hs}年{hs}\d{{1,2}}{hs}月{hs}\d{{1,2}}{hs}日|{unpublished})",
        hs = HS,
        unpublished = spaced("未发表"),
    )
}

lazy_static! {
    // Serial number printed on the certificate
    pub static ref SERIAL_NO: Regex = Regex::new(
        r"(?i)No[.．]?[^\S\n]*[:：]?[^\S\n]*(\d{6,})"
    ).unwrap();

    pub static ref SERIAL_XUHAO: Regex = Regex::new(
        &format!(r"{}{}(\d+)", spaced("序号"), SEP)
    ).unwrap();

    // Copyright owner
    pub static ref OWNER_INLINE: Regex = inline("著作权人");
    pub static ref OWNER_NEXT_LINE: Regex = next_line("著作权人");

    // Software name, with an optional continuation line
    pub static ref NAME_INLINE: Regex = Regex::new(
        &format!(r"{}{}{}(?:\n[^\S\n]*([^\n]+))?", spaced("软件名称"), SEP, VALUE)
    ).unwrap();
    pub static ref NAME_NEXT_LINE: Regex = next_line("软件名称");

    // First publication date
    pub static ref DATE_LABELED: Regex = Regex::new(
        &format!("{}{}{}", spaced("首次发表日期"), SEP, date_value())
    ).unwrap();
    pub static ref DATE_SHORT_LABEL: Regex = Regex::new(
        &format!("{}{}{}", spaced("发表日期"), SEP, date_value())
    ).unwrap();

    // Acquisition method
    pub static ref ACQUISITION_INLINE: Regex = inline("权利取得方式");
    pub static ref ACQUISITION_KEYWORD: Regex = Regex::new(
        &format!(r"((?:原始|继受|受让|承受|继承){}{})", HS, spaced("取得"))
    ).unwrap();

    // Rights scope
    pub static ref SCOPE_INLINE: Regex = inline("权利范围");
    pub static ref SCOPE_KEYWORD: Regex = Regex::new(
        &format!(r"((?:全部|部分){}{})", HS, spaced("权利"))
    ).unwrap();

    // Registration number
    pub static ref REGISTRATION_LABELED: Regex = Regex::new(
        &format!(r"{}{}(\d{{4}}{hs}[Ss]{hs}[Rr]{hs}\d+)", spaced("登记号"), SEP, hs = HS)
    ).unwrap();
    pub static ref REGISTRATION_STANDALONE: Regex = Regex::new(
        &format!(r"(?:^|[^0-9])(\d{{4}}{hs}SR{hs}\d+)", hs = HS)
    ).unwrap();

    // Shapes enforced on cleaned values
    pub static ref REGISTRATION_SHAPE: Regex = Regex::new(r"^\d{4}SR\d{6}$").unwrap();
    pub static ref DATE_SHAPE: Regex = Regex::new(r"^(?:\d{4}年\d{1,2}月\d{1,2}日|未发表)$").unwrap();

    // A wrapped software-name line ends where another field or the version starts
    pub static ref CONTINUATION_STOP: Regex = Regex::new(
        r"^(?:著作权人|版本号|[Vv]\d|首次发表|权利|开发完成|登记号|序号|No)"
    ).unwrap();

    // Page delimiter written by multi-page extraction
    pub static ref PAGE_DELIMITER: Regex = Regex::new(r"--- Page \d+ ---").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaced_label() {
        let re = Regex::new(&spaced("著作权人")).unwrap();
        assert!(re.is_match("著 作 权  人"));
        assert!(re.is_match("著作权人"));
        assert!(!re.is_match("著作\n权人"));
    }

    #[test]
    fn test_keyword_patterns_close_their_groups() {
        let caps = ACQUISITION_KEYWORD.captures("方式 原始 取得").unwrap();
        assert_eq!(&caps[1], "原始 取得");

        let caps = SCOPE_KEYWORD.captures("全部权利").unwrap();
        assert_eq!(&caps[1], "全部权利");
    }

    #[test]
    fn test_registration_standalone_requires_digit_boundary() {
        let caps = REGISTRATION_STANDALONE.captures("编号 2021SR123456").unwrap();
        assert_eq!(&caps[1], "2021SR123456");
        assert!(REGISTRATION_STANDALONE.captures("x12021SR123456").is_none());
    }
}
