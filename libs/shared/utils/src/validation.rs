use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok());

static PHONE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9\s\-]{6,18}[0-9]$").ok());

// Guatemalan DPI / CUI: 13 digits, optionally grouped 4-5-4.
static DPI: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}\s?\d{5}\s?\d{4}$").ok());

fn matches(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

pub fn validate_email(email: &str) -> bool {
    email.len() <= 254 && matches(&EMAIL, email)
}

pub fn validate_phone(phone: &str) -> bool {
    matches(&PHONE, phone.trim())
}

pub fn validate_dpi(dpi: &str) -> bool {
    matches(&DPI, dpi.trim())
}

/// DPI digits without grouping spaces, as stored.
pub fn normalize_dpi(dpi: &str) -> String {
    dpi.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
