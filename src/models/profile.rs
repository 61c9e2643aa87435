use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use super::user::User;

#[derive(Debug, Clone)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub picture: Option<String>,
    pub bio: Option<String>,
}

/// Profile joined with its owner, used for list and detail output.
#[derive(Debug, Clone)]
pub struct ProfileWithUser {
    pub profile: Profile,
    pub user: User,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub picture: Option<String>,
    pub bio: Option<String>,
}

/// Parsed `?user_id&username&firstname&lastname&joined` filters.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Half-open `[start, end)` window on `date_joined`.
    pub joined: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Parses `YYYY-MM-DD,YYYY-MM-DD`. Both days are included.
pub fn parse_joined_range(raw: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, end) = raw.split_once(',')?;
    let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d").ok()?;
    let start = Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0)?);
    let end = Utc.from_utc_datetime(&end.and_hms_opt(0, 0, 0)?) + Duration::days(1);
    Some((start, end))
}

/// Case-insensitive substring match used by the in-memory filters.
pub fn icontains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
