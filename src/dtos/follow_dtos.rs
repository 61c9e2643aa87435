use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::follow::{Follow, FollowView};

#[derive(Debug, Deserialize, ToSchema)]
pub struct FollowIn {
    /// id of the user to follow
    pub followee: Option<i64>,
}

/// Returned by create: both sides as user ids.
#[derive(Debug, Serialize, ToSchema)]
pub struct FollowCreatedOut {
    pub id: i64,
    pub follower: i64,
    pub followee: i64,
}

impl From<&Follow> for FollowCreatedOut {
    fn from(follow: &Follow) -> Self {
        Self {
            id: follow.id,
            follower: follow.follower_id,
            followee: follow.followee_id,
        }
    }
}

/// Returned by list and retrieve: both sides as usernames.
#[derive(Debug, Serialize, ToSchema)]
pub struct FollowOut {
    pub id: i64,
    pub follower: String,
    pub followee: String,
}

impl From<&FollowView> for FollowOut {
    fn from(view: &FollowView) -> Self {
        Self {
            id: view.id,
            follower: view.follower.clone(),
            followee: view.followee.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FollowingOut {
    pub following: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FollowersOut {
    pub followers: Vec<String>,
}
