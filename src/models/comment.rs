#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub reviewer_id: i64,
    pub post_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub post_id: Option<i64>,
    pub reviewer_id: Option<i64>,
    /// Case-insensitive username substring.
    pub reviewer: Option<String>,
}

pub fn validate_feedback(reviewer_id: i64, post_author_id: i64) -> Result<(), String> {
    if reviewer_id == post_author_id {
        return Err("You cannot comment your post".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_cannot_comment_own_post() {
        assert!(validate_feedback(1, 1).is_err());
        assert!(validate_feedback(2, 1).is_ok());
    }
}
