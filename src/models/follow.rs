use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct Follow {
    pub id: i64,
    pub follower_id: i64,
    pub followee_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Follow row with both usernames resolved.
#[derive(Debug, Clone)]
pub struct FollowView {
    pub id: i64,
    pub follower_id: i64,
    pub follower: String,
    pub followee_id: i64,
    pub followee: String,
    pub created_at: DateTime<Utc>,
}

pub const DUPLICATE_FOLLOW: &str = "The fields follower, followee must make a unique set.";

/// A user cannot follow themselves.
pub fn check_not_me(follower_id: i64, followee_id: i64) -> Result<(), String> {
    if follower_id == followee_id {
        return Err("You cannot follow yourself.".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_follow_is_rejected() {
        assert_eq!(check_not_me(3, 3).unwrap_err(), "You cannot follow yourself.");
        assert!(check_not_me(3, 4).is_ok());
    }
}
