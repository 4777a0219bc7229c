//! User-supplied values are never allowed to act as flags.
//!
//! Fixed flags chosen by [`crate::invocation`] are trusted and not checked
//! here; only values that came from the caller are.

use crate::error::{ExecError, Result};

/// Reject a value that a tool could parse as an option.
pub fn sanitize_value(value: &str) -> Result<&str> {
    let reason = if value.starts_with('-') {
        Some("values may not start with '-'")
    } else if value.contains('\0') {
        Some("values may not contain NUL bytes")
    } else if value.is_empty() {
        Some("values may not be empty")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ExecError::InvalidArgument {
            value: value.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(value),
    }
}

pub fn sanitize_values(values: &[String]) -> Result<Vec<String>> {
    values
        .iter()
        .map(|v| sanitize_value(v).map(str::to_string))
        .collect()
}
