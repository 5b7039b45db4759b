//! Validation for the profile wizard and broadcast-authoring inputs.
//! Invalid input re-prompts with specific guidance; the step never advances.

use {chrono::NaiveDate, once_cell::sync::Lazy, regex::Regex};

/// Seconds in the 365-day birthday-edit throttle.
const BIRTHDAY_EDIT_THROTTLE_SECS: i64 = 365 * 24 * 60 * 60;

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\+380|380|0)?\d{9}$").unwrap_or_else(|e| panic!("phone regex: {e}"))
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})\.(\d{2})\.(\d{4})$").unwrap_or_else(|e| panic!("date regex: {e}"))
});

/// Validate a phone number, ignoring spaces, dashes, and parentheses.
/// Returns the input as entered when it is acceptable.
pub fn validate_phone(text: &str) -> Option<String> {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    PHONE_RE.is_match(&stripped).then(|| text.trim().to_string())
}

/// Parse a `DD.MM.YYYY` date, rejecting impossible calendar dates.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(text.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Whether the birthday may be changed, given the epoch seconds of the last
/// change. Returns `Err(days_left)` while still throttled.
pub fn birthday_edit_allowed(changed_at: Option<i64>, now: i64) -> Result<(), i64> {
    let Some(changed_at) = changed_at else {
        return Ok(());
    };
    let elapsed = now - changed_at;
    if elapsed >= BIRTHDAY_EDIT_THROTTLE_SECS {
        return Ok(());
    }
    let remaining = BIRTHDAY_EDIT_THROTTLE_SECS - elapsed;
    let secs_per_day = 24 * 60 * 60;
    Err((remaining + secs_per_day - 1) / secs_per_day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_formats() {
        assert!(validate_phone("+380501234567").is_some());
        assert!(validate_phone("0501234567").is_some());
        assert!(validate_phone("050 123 45 67").is_some());
        assert!(validate_phone("(050) 123-45-67").is_some());
        assert!(validate_phone("12345").is_none());
        assert!(validate_phone("not a phone").is_none());
    }

    #[test]
    fn date_formats() {
        assert_eq!(
            parse_date("15.03.1990"),
            NaiveDate::from_ymd_opt(1990, 3, 15)
        );
        assert!(parse_date("31.02.1990").is_none(), "impossible date");
        assert!(parse_date("1990-03-15").is_none(), "wrong format");
        assert!(parse_date("15.03.90").is_none(), "two-digit year");
    }

    #[test]
    fn birthday_throttle() {
        const DAY: i64 = 24 * 60 * 60;
        assert!(birthday_edit_allowed(None, 0).is_ok());
        assert!(birthday_edit_allowed(Some(0), 365 * DAY).is_ok());
        assert_eq!(birthday_edit_allowed(Some(0), 364 * DAY), Err(1));
        assert_eq!(birthday_edit_allowed(Some(0), DAY), Err(364));
    }
}
