use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::media_dtos::ImageUpload;
use super::{non_empty, parse_id_param};
use crate::error::{ApiResult, ErrorCollector};
use crate::models::profile::{parse_joined_range, ProfileFilter, ProfileWithUser};
use crate::services::media_services::MediaStorage;

/// Raw `/profile` query string. Everything arrives as text so bad values can
/// be reported per parameter.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProfileQuery {
    /// Exact user id, an integer
    pub user_id: Option<String>,
    /// Case-insensitive username substring
    pub username: Option<String>,
    /// Case-insensitive first name substring
    pub firstname: Option<String>,
    /// Case-insensitive last name substring
    pub lastname: Option<String>,
    /// Inclusive join date range, `YYYY-MM-DD,YYYY-MM-DD`
    pub joined: Option<String>,
}

impl ProfileQuery {
    pub fn into_filter(self) -> ApiResult<ProfileFilter> {
        let mut errors = ErrorCollector::new();
        let user_id = parse_id_param(
            self.user_id.as_deref(),
            "user_id",
            "Invalid user ID format. Use integer ?user_id=5",
            &mut errors,
        );
        let joined = match non_empty(self.joined) {
            Some(raw) => {
                let range = parse_joined_range(&raw);
                if range.is_none() {
                    errors.add(
                        "joined",
                        "Invalid joined format. Use ?joined=YYYY-MM-DD,YYYY-MM-DD",
                    );
                }
                range
            }
            None => None,
        };
        errors.finish()?;

        Ok(ProfileFilter {
            user_id,
            username: non_empty(self.username),
            first_name: non_empty(self.firstname),
            last_name: non_empty(self.lastname),
            joined,
        })
    }
}

/// Body of both create and update; every field is optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProfileIn {
    pub picture: Option<ImageUpload>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileOut {
    pub id: i64,
    /// owner's username
    pub user: String,
    pub picture: Option<String>,
    pub bio: Option<String>,
}

impl ProfileOut {
    pub fn new(
        id: i64,
        username: &str,
        picture: Option<&str>,
        bio: Option<String>,
        media: &MediaStorage,
    ) -> Self {
        Self {
            id,
            user: username.to_string(),
            picture: picture.map(|p| media.url_for(p)),
            bio,
        }
    }

    pub fn from_row(row: &ProfileWithUser, media: &MediaStorage) -> Self {
        Self::new(
            row.profile.id,
            &row.user.username,
            row.profile.picture.as_deref(),
            row.profile.bio.clone(),
            media,
        )
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileDetailOut {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub picture: Option<String>,
    pub bio: Option<String>,
    pub joined: DateTime<Utc>,
}

impl ProfileDetailOut {
    pub fn from_row(row: &ProfileWithUser, media: &MediaStorage) -> Self {
        Self {
            username: row.user.username.clone(),
            email: row.user.email.clone(),
            first_name: row.user.first_name.clone(),
            last_name: row.user.last_name.clone(),
            picture: row.profile.picture.as_deref().map(|p| media.url_for(p)),
            bio: row.profile.bio.clone(),
            joined: row.user.date_joined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn valid_query_becomes_filter() {
        let filter = ProfileQuery {
            user_id: Some("5".into()),
            username: Some("  ".into()),
            firstname: Some("ann".into()),
            joined: Some("2024-01-01,2024-01-02".into()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.user_id, Some(5));
        assert_eq!(filter.username, None);
        assert_eq!(filter.first_name.as_deref(), Some("ann"));
        assert!(filter.joined.is_some());
    }

    #[test]
    fn bad_parameters_are_reported_together() {
        let err = ProfileQuery {
            user_id: Some("five".into()),
            joined: Some("last week".into()),
            ..Default::default()
        }
        .into_filter()
        .unwrap_err();
        match err {
            ApiError::Validation(map) => {
                assert_eq!(map["user_id"], vec!["Invalid user ID format. Use integer ?user_id=5"]);
                assert_eq!(
                    map["joined"],
                    vec!["Invalid joined format. Use ?joined=YYYY-MM-DD,YYYY-MM-DD"]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
