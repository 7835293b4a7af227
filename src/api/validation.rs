use chrono::NaiveDate;
use std::net::IpAddr;
use std::str::FromStr;

use super::ApiError;
use crate::domain::ParseEnumError;

/// Parses a role or status name, reporting unknown names as a 400.
pub fn parse_enum<T>(value: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = ParseEnumError>,
{
    T::from_str(value.trim()).map_err(|e| ApiError::validation(e.to_string()))
}

pub fn validate_id(id: i32, what: &str) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {what} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

/// Trims `value` and rejects it if nothing is left.
pub fn validate_required<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Trims optional text, mapping blank values to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_unit_name(name: &str) -> Result<&str, ApiError> {
    let name = validate_required(name, "Unit name")?;
    if name.chars().count() < 3 {
        return Err(ApiError::validation(
            "Unit name must be at least 3 characters",
        ));
    }
    Ok(name)
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let username = validate_required(username, "Username")?;

    if username.len() < 3 || username.len() > 50 {
        return Err(ApiError::validation(
            "Username must be between 3 and 50 characters",
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, dots, hyphens and underscores",
        ));
    }

    Ok(username)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let email = email.trim();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });

    if !valid || email.contains(char::is_whitespace) {
        return Err(ApiError::validation(format!("Invalid email: {email}")));
    }
    Ok(email)
}

pub fn validate_ip(ip: &str) -> Result<IpAddr, ApiError> {
    ip.trim()
        .parse()
        .map_err(|_| ApiError::validation(format!("Invalid IP address: {ip}")))
}

pub fn validate_quantity(quantity: i32) -> Result<i32, ApiError> {
    if quantity < 0 {
        return Err(ApiError::validation(format!(
            "Invalid quantity: {quantity}. Quantity cannot be negative"
        )));
    }
    Ok(quantity)
}

pub fn validate_price(price: f64) -> Result<f64, ApiError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::validation(format!(
            "Invalid unit price: {price}. Price cannot be negative"
        )));
    }
    Ok(price)
}

pub fn validate_password(password: &str, min_length: usize) -> Result<&str, ApiError> {
    if password.chars().count() < min_length {
        return Err(ApiError::validation(format!(
            "Password must be at least {min_length} characters"
        )));
    }
    Ok(password)
}

/// Parses an inclusive `YYYY-MM-DD` range.
pub fn validate_date_range(from: &str, to: &str) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let parse = |value: &str, field: &str| {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
            ApiError::validation(format!("Invalid {field} date: {value}. Expected YYYY-MM-DD"))
        })
    };

    let from = parse(from, "from")?;
    let to = parse(to, "to")?;

    if from > to {
        return Err(ApiError::validation("'from' must not be after 'to'"));
    }
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id(1, "item").is_ok());
        assert!(validate_id(0, "item").is_err());
        assert!(validate_id(-4, "item").is_err());
    }

    #[test]
    fn test_validate_unit_name() {
        assert!(validate_unit_name("Library").is_ok());
        assert_eq!(validate_unit_name("  Lab  ").unwrap(), "Lab");
        assert!(validate_unit_name("IT").is_err());
        assert!(validate_unit_name("   ").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("j.doe").is_ok());
        assert!(validate_username("tech_01").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ops@example.org").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.org").is_err());
        assert!(validate_email("a@localhost").is_err());
    }

    #[test]
    fn test_validate_ip() {
        assert!(validate_ip("10.0.0.12").is_ok());
        assert!(validate_ip("fe80::1").is_ok());
        assert!(validate_ip("10.0.0.300").is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_quantity(0).is_ok());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_price(12.5).is_ok());
        assert!(validate_price(-0.01).is_err());
        assert!(validate_price(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let (from, to) = validate_date_range("2026-03-01", "2026-03-31").unwrap();
        assert!(from < to);
        assert!(validate_date_range("2026-03-01", "2026-03-01").is_ok());
        assert!(validate_date_range("2026-04-01", "2026-03-01").is_err());
        assert!(validate_date_range("01/03/2026", "2026-03-31").is_err());
    }

    #[test]
    fn test_parse_enum() {
        use crate::domain::{RequisitionStatus, Role};

        assert_eq!(
            parse_enum::<RequisitionStatus>(" in_progress ").unwrap(),
            RequisitionStatus::InProgress
        );
        assert!(parse_enum::<Role>("superuser").is_err());
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  x ".into())), Some("x".into()));
        assert_eq!(normalize_optional(Some("   ".into())), None);
        assert_eq!(normalize_optional(None), None);
    }
}
