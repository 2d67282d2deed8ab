//! Best-effort extraction of ratings and release dates from search text.
//!
//! Search snippets phrase the same facts in many ways, so these helpers match a
//! handful of known phrasings and give up otherwise. Ambiguous text yields
//! `None` rather than a guess: when the strongest matching phrasing produces
//! two different values, nothing is returned.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Rating phrasings, strongest first.
static RATING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "IMDb rating: 8.8", "IMDb RATING 8.8/10"
        r"(?i)\bimdb\s+rating[:·\s]+(\d{1,2}(?:\.\d+)?)(?:[^\d.]|\.(?:\D|$)|$)",
        // "Rated 8.7/10"
        r"(?i)\brated[:\s]+(\d{1,2}(?:\.\d+)?)\s*/\s*10(?:[^\d/]|$)",
        // "8.7/10", but not the "7/10" inside "7/10/2010"
        r"(?:^|[^\d./])(\d{1,2}(?:\.\d+)?)\s*/\s*10(?:[^\d/]|$)",
        // "rating: 8.7" needs a decimal point to count
        r"(?i)\brating[:\s]+(\d{1,2}\.\d+)(?:[^\d.%]|\.(?:\D|$)|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid rating regex"))
    .collect()
});

/// English month names and their three-letter abbreviations.
const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b";

/// A release cue followed by a date in one of the supported layouts.
static RELEASE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?xi)
        \b(?:
            released?(?:\s+on)?
            | release\s+date
            | premiered(?:\s+on)?
            | premiere\s+date
            | aired(?:\s+on)?
            | air\s+date
            | out\s+on
        )
        \s*[:·\-–—]?\s*
        (?:
            (?P<iso>\d{{4}}-\d{{2}}-\d{{2}})
            | (?P<mdy>{month}\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}})
            | (?P<dmy>\d{{1,2}}(?:st|nd|rd|th)?\s+{month}\.?,?\s+\d{{4}})
            | (?P<num>\d{{1,2}}[/.]\d{{1,2}}[/.]\d{{4}})
        )",
        month = MONTH
    ))
    .expect("Invalid release date regex")
});

static ORDINAL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d)(?:st|nd|rd|th)\b").expect("Invalid ordinal regex"));

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("Invalid year regex"));

static TITLE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d{4})\)").expect("Invalid title year regex"));

/// Extract a rating on a 0-10 scale.
///
/// Phrasings are tried strongest first ("IMDb rating", "rated N/10", "N/10",
/// "rating: N.N"). The first phrasing that matches decides; if it matches two
/// different values the text is considered ambiguous.
pub fn extract_rating(text: &str) -> Option<f32> {
    for pattern in RATING_PATTERNS.iter() {
        let values: Vec<f32> = pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<f32>().ok())
            .filter(|v| (0.0..=10.0).contains(v))
            .collect();

        let Some(&first) = values.first() else {
            continue;
        };

        return if values.iter().all(|v| (v - first).abs() < f32::EPSILON) {
            Some(first)
        } else {
            None
        };
    }

    None
}

/// Extract a release date as an ISO-8601 (`YYYY-MM-DD`) string.
///
/// Only dates that follow a release cue ("Released:", "release date",
/// "premiered", "aired", ...) are considered. Numeric dates whose day/month
/// order cannot be determined, and texts with conflicting cued dates, yield
/// `None`.
pub fn extract_release_date(text: &str) -> Option<String> {
    let mut found: Option<NaiveDate> = None;

    for caps in RELEASE_DATE.captures_iter(text) {
        let parsed = if let Some(m) = caps.name("iso") {
            NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok()
        } else if let Some(m) = caps.name("mdy").or_else(|| caps.name("dmy")) {
            parse_textual_date(m.as_str())
        } else if let Some(m) = caps.name("num") {
            parse_numeric_date(m.as_str())
        } else {
            None
        };

        match (found, parsed) {
            (_, None) => continue,
            (None, Some(date)) => found = Some(date),
            (Some(prev), Some(date)) if prev == date => {}
            (Some(_), Some(_)) => return None,
        }
    }

    found.map(|d| d.format("%Y-%m-%d").to_string())
}

/// First plausible four-digit year (1900-2099) in the text.
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR.captures(text)?.get(1)?.as_str().parse().ok()
}

/// Year written in parentheses in a title, e.g. "Inception (2010)".
pub fn title_year(title: &str) -> Option<i32> {
    TITLE_YEAR.captures(title)?.get(1)?.as_str().parse().ok()
}

/// Parse "July 16, 2010", "Jul. 16th 2010" or "16 July 2010".
fn parse_textual_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = ORDINAL_SUFFIX.replace_all(raw, "$1");
    let cleaned: String = cleaned
        .replace([',', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    ["%B %d %Y", "%d %B %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

/// Parse "07/16/2010" or "16.07.2010" when the day/month order is unambiguous.
fn parse_numeric_date(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<u32> = raw
        .split(['/', '.'])
        .map(|p| p.parse().ok())
        .collect::<Option<Vec<_>>>()?;
    let [a, b, year] = parts[..] else {
        return None;
    };

    let (month, day) = if a == b {
        (a, b)
    } else if a > 12 && b <= 12 {
        (b, a)
    } else if b > 12 && a <= 12 {
        (a, b)
    } else {
        return None;
    };

    NaiveDate::from_ymd_opt(year as i32, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_rated_out_of_ten() {
        assert_eq!(extract_rating("Rated 8.7/10 by critics"), Some(8.7));
    }

    #[test]
    fn test_rating_absent() {
        assert_eq!(extract_rating("A mind-bending heist thriller."), None);
        assert_eq!(extract_rating("The movie is rated PG-13."), None);
        assert_eq!(extract_rating(""), None);
    }

    #[test]
    fn test_rating_imdb_phrase_wins_over_other_scores() {
        let text = "IMDb rating: 8.8. Metacritic users gave it 7.1/10.";
        assert_eq!(extract_rating(text), Some(8.8));
    }

    #[test]
    fn test_rating_conflicting_scores_are_ambiguous() {
        assert_eq!(extract_rating("Critics: 7.4/10. Audience: 8.9/10."), None);
    }

    #[test]
    fn test_rating_repeated_score_is_not_ambiguous() {
        assert_eq!(extract_rating("8.8/10 from 2.5M users ... 8.8/10"), Some(8.8));
    }

    #[test]
    fn test_rating_ignores_dates_and_out_of_range() {
        assert_eq!(extract_rating("Showing on 7/10/2010 only"), None);
        assert_eq!(extract_rating("rating: 85.5%"), None);
        assert_eq!(extract_rating("IMDb rating 2010"), None);
    }

    #[test]
    fn test_rating_keeps_full_fraction() {
        assert_eq!(extract_rating("IMDb rating: 8.855 from fans"), Some(8.855));
        assert_eq!(extract_rating("IMDb rating: 8.8. Loved it"), Some(8.8));
        assert_eq!(extract_rating("Rating: 7.25 overall"), Some(7.25));
    }

    #[test]
    fn test_rating_bare_rating_needs_decimal() {
        assert_eq!(extract_rating("Rating: 7.9 on IMDb"), Some(7.9));
        assert_eq!(extract_rating("Rating: 13 and up"), None);
    }

    #[test]
    fn test_release_date_iso() {
        assert_eq!(
            extract_release_date("Released: 2010-07-16"),
            Some("2010-07-16".to_string())
        );
    }

    #[test]
    fn test_release_date_textual_formats() {
        assert_eq!(
            extract_release_date("Release date · July 16, 2010 (United States)"),
            Some("2010-07-16".to_string())
        );
        assert_eq!(
            extract_release_date("It premiered on 8 July 2010 in London."),
            Some("2010-07-08".to_string())
        );
        assert_eq!(
            extract_release_date("The pilot aired on September 20th, 2015."),
            Some("2015-09-20".to_string())
        );
        assert_eq!(
            extract_release_date("Released Jul 16th, 2010."),
            Some("2010-07-16".to_string())
        );
    }

    #[test]
    fn test_release_date_numeric_order() {
        assert_eq!(
            extract_release_date("Released 07/16/2010"),
            Some("2010-07-16".to_string())
        );
        assert_eq!(
            extract_release_date("Released 16.07.2010"),
            Some("2010-07-16".to_string())
        );
        // Day and month could be either way round.
        assert_eq!(extract_release_date("Released 03/04/2010"), None);
    }

    #[test]
    fn test_release_date_ambiguous_or_missing() {
        assert_eq!(extract_release_date("Coming to theaters in 2010"), None);
        assert_eq!(extract_release_date("Posted 2010-07-16 by admin"), None);
        assert_eq!(
            extract_release_date("Released: 2010-07-16 (US). Released: 2010-07-22 (UK)."),
            None
        );
        assert_eq!(extract_release_date("Released: 2010-13-45"), None);
        assert_eq!(extract_release_date("Released worldwide 16, 2010"), None);
        assert!(!RELEASE_DATE.is_match("Released worldwide 16, 2010"));
    }

    #[test]
    fn test_years() {
        assert_eq!(extract_year("A 2010 science fiction action film"), Some(2010));
        assert_eq!(extract_year("Runtime 148 minutes"), None);
        assert_eq!(title_year("Inception (2010) - IMDb"), Some(2010));
        assert_eq!(title_year("Inception - IMDb"), None);
    }
}
