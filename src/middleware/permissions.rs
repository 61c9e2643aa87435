use crate::error::{ApiError, ApiResult};
use crate::middleware::auth_extractor::AuthenticatedUser;

/// Unsafe methods are reserved for the object's owner.
pub fn ensure_owner(user: &AuthenticatedUser, owner_id: i64) -> ApiResult<()> {
    if user.user_id == owner_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            token_key: "k".into(),
        }
    }

    #[test]
    fn only_owner_passes() {
        assert!(ensure_owner(&user(1), 1).is_ok());
        assert!(matches!(ensure_owner(&user(2), 1), Err(ApiError::Forbidden)));
    }
}
