use crate::utils::error::{DashboardError, Result};
use chrono::{FixedOffset, Weekday};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl Into<String>, reason: impl Into<String>) -> DashboardError {
    DashboardError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.into(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", scheme),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value.to_string(),
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_file_extension(field_name: &str, file: &str, allowed_extensions: &[&str]) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    match std::path::Path::new(file).extension().and_then(|ext| ext.to_str()) {
        Some(extension) if allowed_set.contains(extension) => Ok(()),
        Some(extension) => Err(invalid(
            field_name,
            file,
            format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        )),
        None => Err(invalid(
            field_name,
            file,
            "File has no extension or invalid filename",
        )),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

/// 解析 `+HH:MM` / `-HH:MM` / `Z` / `UTC` 格式的時區偏移
pub fn parse_utc_offset(field_name: &str, raw: &str) -> Result<FixedOffset> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| invalid(field_name, raw, "Offset out of range"));
    }

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid(field_name, raw, "Offset must start with '+' or '-'")),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| invalid(field_name, raw, "Offset must look like -06:00"))?;
    let hours: i32 = hours
        .parse()
        .map_err(|_| invalid(field_name, raw, "Offset hours are not a number"))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| invalid(field_name, raw, "Offset minutes are not a number"))?;
    if hours > 23 || minutes > 59 {
        return Err(invalid(field_name, raw, "Offset out of range"));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| invalid(field_name, raw, "Offset out of range"))
}

pub fn parse_weekday(field_name: &str, raw: &str) -> Result<Weekday> {
    raw.trim()
        .to_ascii_lowercase()
        .parse::<Weekday>()
        .map_err(|_| invalid(field_name, raw, "Expected a weekday name such as 'sunday' or 'monday'"))
}
