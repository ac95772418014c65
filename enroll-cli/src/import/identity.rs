//! Phone and email canonicalization
//!
//! Pure, total functions. Phones are compared on their last ten digits so
//! country and area prefixes ("+91 ...") don't create duplicate identities;
//! emails are compared lowercase while the stored value keeps its original
//! casing.

/// Digits of a raw phone value, keeping only the last ten when longer.
/// Returns whatever digits remain, which may be fewer than ten.
pub fn phone_digits(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() > 10 {
        digits[digits.len() - 10..].to_string()
    } else {
        digits
    }
}

/// Canonical phone: exactly ten digits, or `None` when the value doesn't
/// hold a usable phone at all.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits = phone_digits(raw);
    if digits.len() == 10 { Some(digits) } else { None }
}

/// Canonical email for equality comparison only; stored emails keep their
/// original casing.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Local part of an email address ("jane" from "jane@example.com").
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
