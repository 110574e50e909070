//! crates/aikido_live_core/src/validation.rs
//!
//! Input rules for registration, passwords, blog posts and comments.

use std::ops::RangeInclusive;

pub const PASSWORD_LENGTH: RangeInclusive<usize> = 6..=100;
pub const POST_TITLE_LENGTH: RangeInclusive<usize> = 5..=200;
pub const POST_CONTENT_LENGTH: RangeInclusive<usize> = 50..=50_000;
pub const COMMENT_LENGTH: RangeInclusive<usize> = 5..=1000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("{field} must be between {min} and {max} characters long")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
    },
    #[error("The password and confirmation password do not match")]
    PasswordMismatch,
}

fn check_length(
    field: &'static str,
    value: &str,
    range: RangeInclusive<usize>,
) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(ValidationError::Required(field));
    }
    if !range.contains(&len) {
        return Err(ValidationError::Length {
            field,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(())
}

/// A plausibility check: one `@`, a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required("Email"));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn validate_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len == 0 {
        return Err(ValidationError::Required("Password"));
    }
    if !PASSWORD_LENGTH.contains(&len) {
        return Err(ValidationError::Length {
            field: "Password",
            min: *PASSWORD_LENGTH.start(),
            max: *PASSWORD_LENGTH.end(),
        });
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

pub fn validate_registration(
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    if first_name.trim().is_empty() {
        return Err(ValidationError::Required("First name"));
    }
    if last_name.trim().is_empty() {
        return Err(ValidationError::Required("Last name"));
    }
    validate_email(email)?;
    validate_password(password, confirm_password)
}

pub fn validate_post(title: &str, content: &str) -> Result<(), ValidationError> {
    check_length("Title", title, POST_TITLE_LENGTH)?;
    check_length("Content", content, POST_CONTENT_LENGTH)
}

pub fn validate_comment(content: &str) -> Result<(), ValidationError> {
    check_length("Comment", content, COMMENT_LENGTH)
}

/// Splits a comma-separated tag string, dropping blanks and duplicates.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_plausibility() {
        assert!(validate_email("alice@example.com").is_ok());
        assert_eq!(validate_email(""), Err(ValidationError::Required("Email")));
        assert_eq!(validate_email("alice"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("alice@localhost"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a b@x.com"), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("secret1", "secret1").is_ok());
        assert!(matches!(
            validate_password("short", "short"),
            Err(ValidationError::Length { .. })
        ));
        assert_eq!(
            validate_password("secret1", "secret2"),
            Err(ValidationError::PasswordMismatch)
        );
    }

    #[test]
    fn post_length_limits() {
        let content = "x".repeat(50);
        assert!(validate_post("Hello", &content).is_ok());
        assert!(validate_post("Hi", &content).is_err());
        assert!(validate_post("Hello", "too short").is_err());
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_tags(" kata, ukemi ,,Kata, weapons "),
            vec!["kata", "ukemi", "weapons"]
        );
        assert!(parse_tags("  ").is_empty());
    }
}
