//! Input validation for registration and entity attributes.

use crate::GameError;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 32;
pub const SECRET_MIN: usize = 8;
pub const SECRET_MAX: usize = 128;
pub const EMAIL_MAX: usize = 254;
pub const NAME_MAX: usize = 50;
pub const CATEGORY_MAX: usize = 30;

fn invalid(msg: impl Into<String>) -> GameError {
    GameError::InvalidInput(msg.into())
}

/// Letters, digits, `_`, `-` and `.`; trimmed.
pub fn username(raw: &str) -> Result<String, GameError> {
    let value = raw.trim();
    let len = value.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(invalid(format!(
            "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(invalid("username may only contain letters, digits, '_', '-' and '.'"));
    }
    Ok(value.to_owned())
}

/// Trimmed and lowercased; used both for storing and for lookups.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn email(raw: &str) -> Result<String, GameError> {
    let value = normalize_email(raw);
    if value.is_empty() || value.len() > EMAIL_MAX || value.chars().any(char::is_whitespace) {
        return Err(invalid("email is not valid"));
    }
    let Some((local, domain)) = value.split_once('@') else {
        return Err(invalid("email is not valid"));
    };
    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.');
    if local.is_empty() || !domain_ok {
        return Err(invalid("email is not valid"));
    }
    Ok(value)
}

/// Length limits only; the secret is never trimmed or stored.
pub fn secret(raw: &str) -> Result<(), GameError> {
    let len = raw.chars().count();
    if !(SECRET_MIN..=SECRET_MAX).contains(&len) {
        return Err(invalid(format!(
            "password must be {SECRET_MIN}-{SECRET_MAX} characters"
        )));
    }
    if raw.trim().is_empty() {
        return Err(invalid("password must not be blank"));
    }
    Ok(())
}

/// A trimmed, non-empty label of at most `max` characters.
pub fn label(field: &str, raw: &str, max: usize) -> Result<String, GameError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(invalid(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(invalid(format!("{field} must be at most {max} characters")));
    }
    Ok(value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert_eq!(username("  alice ").unwrap(), "alice");
        assert!(username("al").is_err());
        assert!(username(&"x".repeat(33)).is_err());
        assert!(username("bad name").is_err());
        assert!(username("o'brien").is_err());
        assert_eq!(username("dark_knight-2.0").unwrap(), "dark_knight-2.0");
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(email(" Alice@Example.COM ").unwrap(), "alice@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "alice", "@example.com", "alice@", "alice@example", "a@b@c.com", "a b@c.com", "alice@.com", "alice@com."] {
            assert!(
                matches!(email(bad), Err(GameError::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn secrets() {
        assert!(secret("hunter22").is_ok());
        assert!(secret("short").is_err());
        assert!(secret("        ").is_err());
        assert!(secret(&"p".repeat(SECRET_MAX + 1)).is_err());
    }

    #[test]
    fn labels() {
        assert_eq!(label("name", "  Thorn ", NAME_MAX).unwrap(), "Thorn");
        assert!(label("name", "   ", NAME_MAX).is_err());
        assert!(label("class", &"w".repeat(CATEGORY_MAX + 1), CATEGORY_MAX).is_err());
        // Limits count characters, not bytes.
        assert!(label("name", &"ñ".repeat(NAME_MAX), NAME_MAX).is_ok());
    }
}
