//! Sign-in and sign-up form checks, run before anything is sent.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email)
}

/// Per-field error messages. Empty when the form may be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_password: Option<String>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.confirm_password.is_none()
    }

    /// Messages in form order.
    pub fn messages(&self) -> Vec<&str> {
        [
            &self.full_name,
            &self.email,
            &self.password,
            &self.confirm_password,
        ]
        .into_iter()
        .filter_map(|m| m.as_deref())
        .collect()
    }
}

fn check_email(email: &str) -> Option<String> {
    if email.trim().is_empty() {
        Some("Email is required".to_string())
    } else if !is_valid_email(email) {
        Some("Please enter a valid email address".to_string())
    } else {
        None
    }
}

fn check_password(password: &str) -> Option<String> {
    if password.is_empty() {
        Some("Password is required".to_string())
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        Some(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ))
    } else {
        None
    }
}

pub fn validate_sign_in(email: &str, password: &str) -> ValidationErrors {
    ValidationErrors {
        email: check_email(email),
        password: check_password(password),
        ..ValidationErrors::default()
    }
}

pub fn validate_sign_up(
    full_name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> ValidationErrors {
    let full_name = full_name
        .trim()
        .is_empty()
        .then(|| "Full name is required".to_string());
    let confirm_password = if confirm_password.is_empty() {
        Some("Please confirm your password".to_string())
    } else if password != confirm_password {
        Some("Passwords do not match".to_string())
    } else {
        None
    };

    ValidationErrors {
        full_name,
        email: check_email(email),
        password: check_password(password),
        confirm_password,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_sign_in() {
        assert!(validate_sign_in("a@b.com", "secret1").is_empty());
    }

    #[test]
    fn test_sign_in_errors() {
        let errors = validate_sign_in("   ", "");
        assert_eq!(errors.email.as_deref(), Some("Email is required"));
        assert_eq!(errors.password.as_deref(), Some("Password is required"));
        assert_eq!(errors.full_name, None);

        let errors = validate_sign_in("not-an-email", "12345");
        assert_eq!(
            errors.email.as_deref(),
            Some("Please enter a valid email address")
        );
        assert_eq!(
            errors.password.as_deref(),
            Some("Password must be at least 6 characters")
        );
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("user@example.co"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("us er@example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn test_sign_up_errors() {
        let errors = validate_sign_up(" ", "a@b.com", "secret1", "");
        assert_eq!(errors.full_name.as_deref(), Some("Full name is required"));
        assert_eq!(
            errors.confirm_password.as_deref(),
            Some("Please confirm your password")
        );

        let errors = validate_sign_up("Ann", "a@b.com", "secret1", "secret2");
        assert_eq!(
            errors.confirm_password.as_deref(),
            Some("Passwords do not match")
        );
        assert_eq!(errors.messages(), vec!["Passwords do not match"]);

        assert!(validate_sign_up("Ann", "a@b.com", "secret1", "secret1").is_empty());
    }
}
