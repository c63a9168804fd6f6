//! Timestamp patterns
//!
//! A wiki renders signature timestamps with a locale-specific date format followed by a
//! parenthesized timezone abbreviation, e.g. `12:34, 5 March 2021 (UTC)`. [`TimestampPattern`]
//! compiles such a format into a regular expression with one capturing group per format code,
//! and maps the groups of a match back to calendar fields.
//!
//! Format codes
//!
//!     d  j       day of month, 2 digits / 1-2 digits
//!     D  l       weekday name, short / long (matched, then ignored)
//!     F  M  xg   month name, long / short / genitive
//!     n          month number, 1-2 digits
//!     Y  xkY     year, 4 digits / Thai solar year (4 digits, minus 543)
//!     G  H       hour on a 24h clock, 1-2 / 2 digits
//!     g  h       hour on a 12h clock, 1-2 / 2 digits, paired with `a` (am/pm) or `A` (AM/PM)
//!     i          minute, 2 digits
//!     xx         a literal `x`
//!     \c         the escaped character `c`
//!     "..."      a quoted literal (an unterminated quote is a literal `"`)
//!
//! Digit groups are sized to exactly the digits their code implies, so adjacent numeric fields
//! cannot mis-split. Any other ASCII letter is an error: bad locale data should fail loudly
//! rather than be matched as literal text.
//!
//! Resolving fields to an instant happens in the wiki's timezone. At a DST fall-back the same
//! local time occurs twice and the rendered abbreviation decides which one was meant.

use crate::error::{ParserError, ParserResult};
use crate::locale::LocaleData;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::{OffsetName, Tz};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonthNames {
    Long,
    Short,
    Genitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    /// `d` / `j`
    Day { padded: bool },
    /// `D` / `l`
    Weekday { short: bool },
    Month(MonthNames),
    MonthNumber,
    Year,
    ThaiYear,
    /// `G` / `H`
    Hour { padded: bool },
    /// `g` / `h`
    Hour12 { padded: bool },
    /// `a` / `A`
    Meridiem { upper: bool },
    Minute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Field(Field),
}

/// Why a parsed timestamp deserves a second look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampWarning {
    /// The written local time does not exist (skipped by a DST switch) and was moved forward.
    AmbiguousTime,
    /// The rendered abbreviation is not in effect at the written time. Genuine signatures never
    /// do this; it points at hand-typed timestamps.
    ImpossibleAbbreviation,
}

impl TimestampWarning {
    pub fn message(&self) -> &'static str {
        match self {
            TimestampWarning::AmbiguousTime => "Ambiguous time at DST switchover was parsed",
            TimestampWarning::ImpossibleAbbreviation => {
                "Timestamp has timezone abbreviation for the wrong time"
            }
        }
    }
}

impl fmt::Display for TimestampWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Calendar fields recovered from a match. `month` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFields {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    /// Canonical abbreviation matching the rendered one.
    pub timezone_abbreviation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub instant: DateTime<Utc>,
    pub warning: Option<TimestampWarning>,
}

/// First timestamp found in a piece of text. Offsets count chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampMatch {
    pub start: usize,
    pub end: usize,
    pub fields: TimestampFields,
}

#[derive(Debug, Clone)]
pub struct TimestampPattern {
    regex: Regex,
    tokens: Vec<Token>,
    locale: LocaleData,
    digits: Option<Vec<char>>,
    timezone: Tz,
}

impl TimestampPattern {
    pub fn new(locale: &LocaleData) -> ParserResult<Self> {
        let digits = match &locale.digits {
            Some(glyphs) => {
                let glyphs: Vec<char> = glyphs.chars().collect();
                if glyphs.len() != 10 {
                    return Err(ParserError::InvalidLocale(format!(
                        "expected 10 digit glyphs, got {}",
                        glyphs.len()
                    )));
                }
                Some(glyphs)
            }
            None => None,
        };
        check_names("months", &locale.months, 12)?;
        check_names("months_genitive", &locale.months_genitive, 12)?;
        check_names("months_short", &locale.months_short, 12)?;
        check_names("weekdays", &locale.weekdays, 7)?;
        check_names("weekdays_short", &locale.weekdays_short, 7)?;
        if locale.timezone_abbreviations.is_empty() {
            return Err(ParserError::InvalidLocale(
                "no timezone abbreviations".to_string(),
            ));
        }
        let timezone: Tz = locale
            .timezone
            .parse()
            .map_err(|_| ParserError::UnknownTimezone(locale.timezone.clone()))?;

        let tokens = tokenize(&locale.date_format)?;
        let digit_class = match &digits {
            Some(glyphs) => format!(
                "[{}]",
                glyphs.iter().map(|c| regex::escape(&c.to_string())).collect::<String>()
            ),
            None => "[0-9]".to_string(),
        };

        let mut source = String::new();
        for token in &tokens {
            match token {
                Token::Literal(text) => source.push_str(&regex::escape(text)),
                Token::Field(field) => source.push_str(&field_regex(*field, locale, &digit_class)),
            }
        }
        let zones: Vec<&str> = locale
            .timezone_abbreviations
            .iter()
            .map(|abbr| abbr.local.as_str())
            .collect();
        // Parentheses and the space are hard-coded in signatures; invisible direction marks
        // often sneak into copy-pasted timestamps.
        source.push_str(&format!(
            "[\u{200E}\u{200F}]? [\u{200E}\u{200F}]?\\({}\\)",
            alternation(&zones)
        ));

        Ok(Self {
            regex: Regex::new(&source)?,
            tokens,
            locale: locale.clone(),
            digits,
            timezone,
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First match in `text`, with its fields. Matches whose groups cannot be mapped back are
    /// skipped.
    pub fn find(&self, text: &str) -> Option<TimestampMatch> {
        let captures = self.regex.captures(text)?;
        let whole = captures.get(0)?;
        let fields = self.fields(&captures)?;
        Some(TimestampMatch {
            start: text[..whole.start()].chars().count(),
            end: text[..whole.end()].chars().count(),
            fields,
        })
    }

    /// Map capture groups of a match of [`regex`](Self::regex) back to calendar fields.
    pub fn fields(&self, captures: &Captures) -> Option<TimestampFields> {
        let mut fields = TimestampFields {
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            timezone_abbreviation: String::new(),
        };
        let mut afternoon: Option<bool> = None;
        let mut twelve_hour = false;

        let codes = self.tokens.iter().filter_map(|token| match token {
            Token::Field(field) => Some(*field),
            Token::Literal(_) => None,
        });
        let mut group = 0;
        for field in codes {
            group += 1;
            let text = captures.get(group)?.as_str();
            match field {
                Field::Day { .. } => fields.day = self.number(text)?,
                Field::Weekday { .. } => {}
                Field::Month(names) => {
                    let list = match names {
                        MonthNames::Long => &self.locale.months,
                        MonthNames::Short => &self.locale.months_short,
                        MonthNames::Genitive => &self.locale.months_genitive,
                    };
                    fields.month = list.iter().position(|m| m == text)? as u32;
                }
                Field::MonthNumber => fields.month = self.number::<u32>(text)?.checked_sub(1)?,
                Field::Year => fields.year = self.number(text)?,
                Field::ThaiYear => fields.year = self.number::<i32>(text)? - 543,
                Field::Hour { .. } => fields.hour = self.number(text)?,
                Field::Hour12 { .. } => {
                    twelve_hour = true;
                    fields.hour = self.number(text)?;
                }
                Field::Meridiem { .. } => afternoon = Some(text.eq_ignore_ascii_case("pm")),
                Field::Minute => fields.minute = self.number(text)?,
            }
        }
        if twelve_hour {
            fields.hour %= 12;
            if afternoon == Some(true) {
                fields.hour += 12;
            }
        }

        let local = captures.get(group + 1)?.as_str();
        fields.timezone_abbreviation = self.locale.canonical_abbreviation(local)?.to_string();
        Some(fields)
    }

    /// Resolve fields to an instant in the wiki's timezone. `None` when the fields do not form
    /// a calendar date, which makes the match a false positive.
    pub fn resolve(&self, fields: &TimestampFields) -> Option<Timestamp> {
        let naive = NaiveDate::from_ymd_opt(fields.year, fields.month + 1, fields.day)?
            .and_hms_opt(fields.hour, fields.minute, 0)?;
        let expected = fields.timezone_abbreviation.as_str();

        let (local, warning) = match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => {
                let warning = (abbreviation(&dt) != expected)
                    .then_some(TimestampWarning::ImpossibleAbbreviation);
                (dt, warning)
            }
            LocalResult::Ambiguous(earlier, later) => {
                if abbreviation(&earlier) == expected {
                    (earlier, None)
                } else if abbreviation(&later) == expected {
                    (later, None)
                } else {
                    (earlier, Some(TimestampWarning::ImpossibleAbbreviation))
                }
            }
            LocalResult::None => {
                let shifted = self.shift_out_of_gap(naive)?;
                let warning = if abbreviation(&shifted) == expected {
                    TimestampWarning::AmbiguousTime
                } else {
                    TimestampWarning::ImpossibleAbbreviation
                };
                (shifted, Some(warning))
            }
        };

        Some(Timestamp {
            instant: local.with_timezone(&Utc),
            warning,
        })
    }

    /// Find and resolve the first timestamp in `text`.
    pub fn parse(&self, text: &str) -> Option<Timestamp> {
        self.resolve(&self.find(text)?.fields)
    }

    fn shift_out_of_gap(&self, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
        self.timezone
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
    }

    fn number<T: std::str::FromStr>(&self, text: &str) -> Option<T> {
        let ascii: String = match &self.digits {
            Some(glyphs) => text
                .chars()
                .map(|c| match glyphs.iter().position(|g| *g == c) {
                    Some(value) => char::from(b'0' + value as u8),
                    None => c,
                })
                .collect(),
            None => text.to_string(),
        };
        ascii.parse().ok()
    }
}

/// Abbreviation in effect for `dt`; zones without a letter abbreviation render their offset
/// the way tzdata does (`+04`, `+0530`).
fn abbreviation(dt: &DateTime<Tz>) -> String {
    if let Some(abbr) = dt.offset().abbreviation() {
        return abbr.to_string();
    }
    let seconds = dt.offset().fix().local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    match minutes % 60 {
        0 => format!("{}{:02}", sign, minutes / 60),
        rest => format!("{}{:02}{:02}", sign, minutes / 60, rest),
    }
}

fn check_names(what: &str, names: &[String], expected: usize) -> ParserResult<()> {
    if names.len() != expected || names.iter().any(|n| n.is_empty()) {
        return Err(ParserError::InvalidLocale(format!(
            "{} needs {} non-empty names, got {}",
            what,
            expected,
            names.len()
        )));
    }
    Ok(())
}

fn alternation<S: AsRef<str>>(options: &[S]) -> String {
    let escaped: Vec<String> = options.iter().map(|o| regex::escape(o.as_ref())).collect();
    format!("({})", escaped.join("|"))
}

fn field_regex(field: Field, locale: &LocaleData, digit: &str) -> String {
    let digits = |count: &str| format!("({}{{{}}})", digit, count);
    match field {
        Field::Day { padded: true }
        | Field::Hour { padded: true }
        | Field::Hour12 { padded: true }
        | Field::Minute => digits("2"),
        Field::Day { padded: false }
        | Field::Hour { padded: false }
        | Field::Hour12 { padded: false }
        | Field::MonthNumber => digits("1,2"),
        Field::Year | Field::ThaiYear => digits("4"),
        Field::Weekday { short: true } => alternation(&locale.weekdays_short),
        Field::Weekday { short: false } => alternation(&locale.weekdays),
        Field::Month(MonthNames::Long) => alternation(&locale.months),
        Field::Month(MonthNames::Short) => alternation(&locale.months_short),
        Field::Month(MonthNames::Genitive) => alternation(&locale.months_genitive),
        Field::Meridiem { upper: false } => "(am|pm)".to_string(),
        Field::Meridiem { upper: true } => "(AM|PM)".to_string(),
    }
}

fn tokenize(format: &str) -> ParserResult<Vec<Token>> {
    let chars: Vec<char> = format.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut p = 0;

    while p < chars.len() {
        let mut code = chars[p].to_string();
        if code == "x" && p + 1 < chars.len() {
            p += 1;
            code.push(chars[p]);
        }
        if code == "xk" && p + 1 < chars.len() {
            p += 1;
            code.push(chars[p]);
        }

        let field = match code.as_str() {
            "d" => Some(Field::Day { padded: true }),
            "j" => Some(Field::Day { padded: false }),
            "D" => Some(Field::Weekday { short: true }),
            "l" => Some(Field::Weekday { short: false }),
            "F" => Some(Field::Month(MonthNames::Long)),
            "M" => Some(Field::Month(MonthNames::Short)),
            "xg" => Some(Field::Month(MonthNames::Genitive)),
            "n" => Some(Field::MonthNumber),
            "Y" => Some(Field::Year),
            "xkY" => Some(Field::ThaiYear),
            "G" => Some(Field::Hour { padded: false }),
            "H" => Some(Field::Hour { padded: true }),
            "g" => Some(Field::Hour12 { padded: false }),
            "h" => Some(Field::Hour12 { padded: true }),
            "a" => Some(Field::Meridiem { upper: false }),
            "A" => Some(Field::Meridiem { upper: true }),
            "i" => Some(Field::Minute),
            "xx" => {
                literal.push('x');
                None
            }
            "\\" => {
                if p + 1 < chars.len() {
                    p += 1;
                    literal.push(chars[p]);
                } else {
                    literal.push('\\');
                }
                None
            }
            "\"" => {
                let closing = chars[p + 1..].iter().position(|c| *c == '"');
                match closing {
                    Some(length) if p + 1 < chars.len() => {
                        literal.extend(&chars[p + 1..p + 1 + length]);
                        p += length + 1;
                    }
                    _ => literal.push('"'),
                }
                None
            }
            other if other.starts_with(|c: char| c.is_ascii_alphabetic()) => {
                return Err(ParserError::UnknownFormatCode {
                    code: other.to_string(),
                    format: format.to_string(),
                });
            }
            other => {
                literal.push_str(other);
                None
            }
        };

        if let Some(field) = field {
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(Token::Field(field));
        }
        p += 1;
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::TimezoneAbbreviation;
    use chrono::{Datelike, Timelike};
    use proptest::prelude::*;
    use rstest::rstest;

    fn new_york() -> LocaleData {
        LocaleData::english().with_timezone(
            "America/New_York",
            vec![
                TimezoneAbbreviation::new("EDT", "EDT"),
                TimezoneAbbreviation::new("EST", "EST"),
                TimezoneAbbreviation::new("PST", "PST"),
            ],
        )
    }

    /// Render fields through the pattern's own tokens, as the wiki would.
    fn render(pattern: &TimestampPattern, fields: &TimestampFields, zone: &str) -> String {
        let locale = &pattern.locale;
        let digit = |n: u32, width: usize| -> String {
            let ascii = format!("{:0width$}", n, width = width);
            match &pattern.digits {
                Some(glyphs) => ascii
                    .chars()
                    .map(|c| glyphs[c.to_digit(10).unwrap() as usize])
                    .collect(),
                None => ascii,
            }
        };
        let hour12 = match fields.hour % 12 {
            0 => 12,
            h => h,
        };
        let mut out = String::new();
        for token in &pattern.tokens {
            let piece = match token {
                Token::Literal(text) => text.clone(),
                Token::Field(field) => match field {
                    Field::Day { padded } => digit(fields.day, if *padded { 2 } else { 1 }),
                    Field::Weekday { short: true } => locale.weekdays_short[0].clone(),
                    Field::Weekday { short: false } => locale.weekdays[0].clone(),
                    Field::Month(MonthNames::Long) => locale.months[fields.month as usize].clone(),
                    Field::Month(MonthNames::Short) => {
                        locale.months_short[fields.month as usize].clone()
                    }
                    Field::Month(MonthNames::Genitive) => {
                        locale.months_genitive[fields.month as usize].clone()
                    }
                    Field::MonthNumber => digit(fields.month + 1, 1),
                    Field::Year => digit(fields.year as u32, 4),
                    Field::ThaiYear => digit(fields.year as u32 + 543, 4),
                    Field::Hour { padded } => digit(fields.hour, if *padded { 2 } else { 1 }),
                    Field::Hour12 { padded } => digit(hour12, if *padded { 2 } else { 1 }),
                    Field::Meridiem { upper } => {
                        let marker = if fields.hour >= 12 { "pm" } else { "am" };
                        if *upper {
                            marker.to_uppercase()
                        } else {
                            marker.to_string()
                        }
                    }
                    Field::Minute => digit(fields.minute, 2),
                },
            };
            out.push_str(&piece);
        }
        format!("{} ({})", out, zone)
    }

    #[test]
    fn matches_default_english_signature() {
        let pattern = TimestampPattern::new(&LocaleData::english()).unwrap();
        let text = "Sounds good. 12:34, 5 March 2021 (UTC) and more";
        let found = pattern.find(text).unwrap();
        assert_eq!(&text[found.start..found.end], "12:34, 5 March 2021 (UTC)");
        assert_eq!(
            found.fields,
            TimestampFields {
                year: 2021,
                month: 2,
                day: 5,
                hour: 12,
                minute: 34,
                timezone_abbreviation: "UTC".to_string(),
            }
        );
        let ts = pattern.resolve(&found.fields).unwrap();
        assert_eq!(ts.instant.to_rfc3339(), "2021-03-05T12:34:00+00:00");
        assert_eq!(ts.warning, None);
    }

    #[test]
    fn tolerates_direction_marks_before_zone() {
        let pattern = TimestampPattern::new(&LocaleData::english()).unwrap();
        assert!(pattern.find("12:34, 5 March 2021\u{200E} \u{200F}(UTC)").is_some());
        assert!(pattern.find("12:34, 5 March 2021(UTC)").is_none());
    }

    #[rstest]
    #[case("H:i, j F Y", "10:05, 1 May 2021 (UTC)")]
    #[case("Y\"年\"n\"月\"j\"日\" (D) H:i", "2021年5月1日 (Sun) 10:05 (UTC)")]
    #[case("\\H\\i j xg Y", "Hi 1 May 2021 (UTC)")]
    fn literals_survive_tokenizing(#[case] format: &str, #[case] shown: &str) {
        let locale = LocaleData::english().with_date_format(format);
        let pattern = TimestampPattern::new(&locale).unwrap();
        let fields = TimestampFields {
            year: 2021,
            month: 4,
            day: 1,
            hour: 10,
            minute: 5,
            timezone_abbreviation: "UTC".to_string(),
        };
        assert_eq!(render(&pattern, &fields, "UTC"), shown);
    }

    #[rstest]
    #[case("H:i, j F Y S")]
    #[case("xn H:i")]
    #[case("U")]
    fn unknown_codes_are_errors(#[case] format: &str) {
        let locale = LocaleData::english().with_date_format(format);
        let err = TimestampPattern::new(&locale).unwrap_err();
        assert!(matches!(err, ParserError::UnknownFormatCode { .. }), "{err}");
    }

    #[test]
    fn quoted_literal_and_escape_are_literal() {
        let tokens = tokenize("\"at\" \\H xx").unwrap();
        assert_eq!(tokens, vec![Token::Literal("at H x".to_string())]);
        let unterminated = tokenize("\"H").unwrap();
        assert_eq!(
            unterminated,
            vec![
                Token::Literal("\"".to_string()),
                Token::Field(Field::Hour { padded: true })
            ]
        );
    }

    #[test]
    fn localized_digits_and_thai_year() {
        let locale = LocaleData::english()
            .with_date_format("H:i, j F xkY")
            .with_digits("๐๑๒๓๔๕๖๗๘๙");
        let pattern = TimestampPattern::new(&locale).unwrap();
        let ts = pattern.parse("๑๒:๓๔, ๕ March ๒๕๖๔ (UTC)").unwrap();
        assert_eq!(ts.instant.year(), 2021);
        assert_eq!(ts.instant.hour(), 12);
        assert_eq!(ts.instant.minute(), 34);
    }

    #[test]
    fn twelve_hour_clock() {
        let locale = LocaleData::english().with_date_format("g:i a, j F Y");
        let pattern = TimestampPattern::new(&locale).unwrap();
        assert_eq!(pattern.parse("12:05 am, 1 May 2021 (UTC)").unwrap().instant.hour(), 0);
        assert_eq!(pattern.parse("12:05 pm, 1 May 2021 (UTC)").unwrap().instant.hour(), 12);
        assert_eq!(pattern.parse("3:05 pm, 1 May 2021 (UTC)").unwrap().instant.hour(), 15);
    }

    #[test]
    fn impossible_dates_are_not_timestamps() {
        let pattern = TimestampPattern::new(&LocaleData::english()).unwrap();
        let found = pattern.find("12:34, 31 February 2021 (UTC)").unwrap();
        assert!(pattern.resolve(&found.fields).is_none());
    }

    #[test]
    fn fall_back_prefers_instant_matching_abbreviation() {
        let pattern = TimestampPattern::new(&new_york()).unwrap();

        let daylight = pattern.parse("01:30, 7 November 2021 (EDT)").unwrap();
        assert_eq!(daylight.instant.to_rfc3339(), "2021-11-07T05:30:00+00:00");
        assert_eq!(daylight.warning, None);

        let standard = pattern.parse("01:30, 7 November 2021 (EST)").unwrap();
        assert_eq!(standard.instant.to_rfc3339(), "2021-11-07T06:30:00+00:00");
        assert_eq!(standard.warning, None);

        let bogus = pattern.parse("01:30, 7 November 2021 (PST)").unwrap();
        assert_eq!(bogus.instant.to_rfc3339(), "2021-11-07T05:30:00+00:00");
        assert_eq!(bogus.warning, Some(TimestampWarning::ImpossibleAbbreviation));
    }

    #[test]
    fn wrong_abbreviation_outside_transition() {
        let pattern = TimestampPattern::new(&new_york()).unwrap();
        let ts = pattern.parse("12:00, 1 July 2021 (EST)").unwrap();
        assert_eq!(ts.warning, Some(TimestampWarning::ImpossibleAbbreviation));
        assert_eq!(ts.instant.to_rfc3339(), "2021-07-01T16:00:00+00:00");
    }

    #[test]
    fn spring_forward_gap_moves_forward() {
        let pattern = TimestampPattern::new(&new_york()).unwrap();
        let ts = pattern.parse("02:30, 14 March 2021 (EDT)").unwrap();
        assert_eq!(ts.instant.to_rfc3339(), "2021-03-14T07:30:00+00:00");
        assert_eq!(ts.warning, Some(TimestampWarning::AmbiguousTime));
    }

    #[test]
    fn numeric_abbreviations() {
        let locale = LocaleData::english().with_timezone(
            "Asia/Dubai",
            vec![TimezoneAbbreviation::new("+04", "+04")],
        );
        let pattern = TimestampPattern::new(&locale).unwrap();
        let ts = pattern.parse("10:00, 1 June 2021 (+04)").unwrap();
        assert_eq!(ts.warning, None);
        assert_eq!(ts.instant.hour(), 6);
    }

    #[test]
    fn bad_locale_data_is_rejected() {
        let mut locale = LocaleData::english();
        locale.months.pop();
        assert!(matches!(
            TimestampPattern::new(&locale),
            Err(ParserError::InvalidLocale(_))
        ));
        let locale = LocaleData::english().with_timezone("Mars/Olympus_Mons", vec![]);
        assert!(TimestampPattern::new(&locale).is_err());
    }

    fn formats() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("H:i, j F Y"),
            Just("H:i, j M Y"),
            Just("H:i, d xg Y"),
            Just("D, d M Y H:i"),
            Just("l j F Y G:i"),
            Just("Y\"年\"n\"月\"j\"日\" H:i"),
            Just("j. n. Y, H:i"),
            Just("h:i A, j F xkY"),
        ]
    }

    proptest! {
        #[test]
        fn rendered_timestamps_round_trip(
            format in formats(),
            thai_digits in any::<bool>(),
            year in 2001i32..2040,
            month in 0u32..12,
            day in 1u32..=28,
            hour in 0u32..24,
            minute in 0u32..60,
        ) {
            let mut locale = LocaleData::english().with_date_format(format);
            if thai_digits {
                locale = locale.with_digits("๐๑๒๓๔๕๖๗๘๙");
            }
            let pattern = TimestampPattern::new(&locale).unwrap();
            let fields = TimestampFields {
                year,
                month,
                day,
                hour,
                minute,
                timezone_abbreviation: "UTC".to_string(),
            };
            let text = format!("Signed by someone. {}", render(&pattern, &fields, "UTC"));
            let found = pattern.find(&text).expect("rendered timestamp matches");
            prop_assert_eq!(found.fields, fields);
            prop_assert_eq!(found.end, text.chars().count());
        }
    }
}
