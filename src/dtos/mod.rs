pub mod auth_dtos;
pub mod comment_dtos;
pub mod follow_dtos;
pub mod like_dtos;
pub mod media_dtos;
pub mod post_dtos;
pub mod profile_dtos;

use crate::error::ErrorCollector;

/// Parses an optional integer query parameter, recording `message` under
/// `field` when it is not a number.
pub(crate) fn parse_id_param(
    raw: Option<&str>,
    field: &str,
    message: &str,
    errors: &mut ErrorCollector,
) -> Option<i64> {
    let raw = raw?.trim();
    match raw.parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, message);
            None
        }
    }
}

/// Empty query values behave as if the parameter was absent.
pub(crate) fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
