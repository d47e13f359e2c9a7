//! Precompiled text patterns for dates, year headers and labels.

use regex::Regex;
use std::sync::LazyLock;

/// Month names, abbreviated or full.
const MONTHS: &str = "Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|\
Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:t)?(?:ember)?|\
Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?";

/// "Jan 15", "Sept. 3", "december 24".
pub static MONTH_DAY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<month>{MONTHS})\.?\s+(?P<day>\d{{1,2}})\b"
    ))
    .unwrap()
});

/// "15 Jan", "3 September".
pub static DAY_MONTH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<day>\d{{1,2}})\s+(?P<month>{MONTHS})\b"
    ))
    .unwrap()
});

/// "Jul 24 – Aug 18", "Jul 24-Aug 18", "Jul 24 to Aug 18".
pub static DATE_RANGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?P<left>\b(?:{MONTHS})\.?\s+\d{{1,2}}\b)\s*(?:–|-|to)\s*(?P<right>\b(?:{MONTHS})\.?\s+\d{{1,2}}\b)"
    ))
    .unwrap()
});

/// A label holding nothing but a month name.
pub static MONTH_ONLY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^(?:{MONTHS})\.?$")).unwrap());

/// A label holding nothing but a 1-2 digit number.
pub static DAY_ONLY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,2}$").unwrap());

/// A label holding nothing but a 4 digit number.
pub static YEAR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{4}$").unwrap());

/// Labels that are never timeline titles: bare months and "Today" markers.
pub static NON_TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^(?:Today|{MONTHS})$")).unwrap());

/// At least one ASCII letter.
pub static HAS_LETTER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]").unwrap());

/// Runs of line breaks, vertical tabs and non-breaking spaces.
pub static BREAKS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n\x{0B}\x{A0}\x{2028}\x{2029}]+").unwrap());

/// Whether the text contains something shaped like a date ("May 17", "17 May").
pub fn looks_like_date(text: &str) -> bool {
    MONTH_DAY_REGEX.is_match(text) || DAY_MONTH_REGEX.is_match(text)
}

/// Month number (1-12) for a month name or abbreviation.
pub fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name
        .chars()
        .take(3)
        .collect::<String>()
        .to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
