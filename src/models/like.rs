#[derive(Debug, Clone)]
pub struct Like {
    pub id: i64,
    pub post_id: i64,
    pub reviewer_id: i64,
    pub is_likes: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LikeFilter {
    pub post_id: Option<i64>,
}

pub const DUPLICATE_LIKE: &str = "The fields post, reviewer must make a unique set.";

pub fn validate_like(reviewer_id: i64, post_author_id: i64) -> Result<(), String> {
    if reviewer_id == post_author_id {
        return Err("You cannot like your post".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_cannot_like_own_post() {
        assert_eq!(validate_like(5, 5).unwrap_err(), "You cannot like your post");
        assert!(validate_like(6, 5).is_ok());
    }
}
