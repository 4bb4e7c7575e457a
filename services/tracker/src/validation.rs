//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() > 64 {
        return Err("Username must be at most 64 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(
            "Username can only contain letters, numbers, dots, dashes and underscores".to_string(),
        );
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate a place identifier handed to the mapping service
pub fn validate_place_id(field: &str, place_id: &str) -> Result<(), String> {
    if place_id.trim().is_empty() {
        return Err(format!("{} is required", field));
    }

    static PLACE_ID_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PLACE_ID_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Failed to compile place id regex"));

    if !regex.is_match(place_id) {
        return Err(format!("{} is not a valid place identifier", field));
    }

    Ok(())
}
