use chrono::{DateTime, Utc};

pub const HASHTAG_MAX_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_published: bool,
    pub time_to_publicate: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Hashtag {
    pub id: i64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Image {
    pub id: i64,
    pub post_id: i64,
    /// Path relative to the media root.
    pub picture: String,
    pub created_at: DateTime<Utc>,
}

/// Post with author name, hashtag labels and image paths attached.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: Post,
    pub author_username: String,
    pub hashtags: Vec<String>,
    pub images: Vec<String>,
}

impl PostDetail {
    pub fn is_visible_to(&self, user_id: i64) -> bool {
        self.post.is_published || self.post.author_id == user_id
    }
}

/// Everything written in the create-post transaction.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub content: String,
    pub is_published: bool,
    pub time_to_publicate: Option<DateTime<Utc>>,
    /// Normalized, de-duplicated labels.
    pub hashtags: Vec<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub content: Option<String>,
    pub hashtags: Option<Vec<String>>,
}

/// Selection used by every post listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub published_only: bool,
    pub author_id: Option<i64>,
    /// Posts whose author is followed by this user.
    pub followed_by: Option<i64>,
    /// Posts this user currently likes.
    pub liked_by: Option<i64>,
    /// Any-of match on normalized hashtag labels.
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub content: Option<String>,
}

/// An unpublished post must carry a publication time in the future.
pub fn validate_publication(
    is_published: bool,
    time_to_publicate: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), String> {
    if is_published {
        return Ok(());
    }
    match time_to_publicate {
        None => Err(
            "Choose a time to_publicate or set is_published = True if you want to publish now."
                .to_string(),
        ),
        Some(at) if at <= now => {
            Err("You must set a future time for `time_to_publicate`.".to_string())
        }
        Some(_) => Ok(()),
    }
}

/// `"  #Rust "` -> `"rust"`.
pub fn normalize_hashtag(raw: &str) -> Result<String, String> {
    let text = raw.trim().trim_start_matches('#').trim().to_lowercase();
    if text.is_empty() {
        return Err("Hashtag may not be blank.".to_string());
    }
    if text.chars().count() > HASHTAG_MAX_LEN {
        return Err(format!(
            "Ensure hashtag has no more than {} characters.",
            HASHTAG_MAX_LEN
        ));
    }
    Ok(text)
}

/// Labels of a `?tags=a,b` filter. Values that could never be stored are
/// kept as-is so they simply match nothing.
pub fn hashtag_filter_labels(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in raw.split(',').filter(|t| !t.trim().is_empty()) {
        let tag = tag.trim().trim_start_matches('#').trim().to_lowercase();
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Normalizes every label and drops duplicates, keeping first-seen order.
pub fn normalize_hashtags<'a, I>(raw: I) -> Result<Vec<String>, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in raw {
        let tag = normalize_hashtag(tag)?;
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    Ok(out)
}
