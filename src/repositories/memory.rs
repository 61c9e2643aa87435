//! In-process implementation of every repository trait. Backs the test suite
//! and `STORAGE_BACKEND=memory`; enforces the same constraints as the SQL schema.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::constraints;
use super::{
    CommentRepository, FollowRepository, LikeRepository, PostRepository, ProfileRepository,
    RepoError, RepoResult, TokenRepository, UserRepository,
};
use crate::models::comment::{Comment, CommentFilter};
use crate::models::follow::{Follow, FollowView};
use crate::models::like::{Like, LikeFilter};
use crate::models::post::{Image, NewPost, Post, PostChanges, PostDetail, PostQuery};
use crate::models::profile::{icontains, Profile, ProfileChanges, ProfileFilter, ProfileWithUser};
use crate::models::user::{NewUser, User};

#[derive(Default)]
struct Sequences {
    users: i64,
    profiles: i64,
    follows: i64,
    hashtags: i64,
    posts: i64,
    images: i64,
    comments: i64,
    likes: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct MemoryState {
    seq: Sequences,
    users: BTreeMap<i64, User>,
    tokens: HashMap<i64, String>,
    profiles: BTreeMap<i64, Profile>,
    follows: BTreeMap<i64, Follow>,
    /// label -> id
    hashtags: HashMap<String, i64>,
    posts: BTreeMap<i64, Post>,
    post_hashtags: BTreeSet<(i64, i64)>,
    images: BTreeMap<i64, Image>,
    comments: BTreeMap<i64, Comment>,
    likes: BTreeMap<i64, Like>,
}

impl MemoryState {
    fn username(&self, user_id: i64) -> String {
        self.users
            .get(&user_id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    fn follow_view(&self, follow: &Follow) -> FollowView {
        FollowView {
            id: follow.id,
            follower_id: follow.follower_id,
            follower: self.username(follow.follower_id),
            followee_id: follow.followee_id,
            followee: self.username(follow.followee_id),
            created_at: follow.created_at,
        }
    }

    fn hashtag_labels(&self, post_id: i64) -> Vec<String> {
        let mut labels: Vec<String> = self
            .hashtags
            .iter()
            .filter(|(_, id)| self.post_hashtags.contains(&(post_id, **id)))
            .map(|(text, _)| text.clone())
            .collect();
        labels.sort();
        labels
    }

    fn post_detail(&self, post: &Post) -> PostDetail {
        PostDetail {
            post: post.clone(),
            author_username: self.username(post.author_id),
            hashtags: self.hashtag_labels(post.id),
            images: self
                .images
                .values()
                .filter(|img| img.post_id == post.id)
                .map(|img| img.picture.clone())
                .collect(),
        }
    }

    fn link_hashtags(&mut self, post_id: i64, hashtags: &[String]) {
        for text in hashtags {
            let id = match self.hashtags.get(text) {
                Some(id) => *id,
                None => {
                    let id = next(&mut self.seq.hashtags);
                    self.hashtags.insert(text.clone(), id);
                    id
                }
            };
            self.post_hashtags.insert((post_id, id));
        }
    }

    fn matches(&self, post: &Post, query: &PostQuery) -> bool {
        if query.published_only && !post.is_published {
            return false;
        }
        if query.author_id.is_some_and(|id| id != post.author_id) {
            return false;
        }
        if let Some(follower_id) = query.followed_by {
            let follows = self
                .follows
                .values()
                .any(|f| f.follower_id == follower_id && f.followee_id == post.author_id);
            if !follows {
                return false;
            }
        }
        if let Some(reviewer_id) = query.liked_by {
            let likes = self
                .likes
                .values()
                .any(|l| l.post_id == post.id && l.reviewer_id == reviewer_id && l.is_likes);
            if !likes {
                return false;
            }
        }
        if !query.tags.is_empty() {
            let labels = self.hashtag_labels(post.id);
            if !query.tags.iter().any(|t| labels.contains(t)) {
                return false;
            }
        }
        if let Some(author) = &query.author {
            if !icontains(&self.username(post.author_id), author) {
                return false;
            }
        }
        if let Some(content) = &query.content {
            if !icontains(&post.content, content) {
                return false;
            }
        }
        true
    }
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> RepoResult<User> {
        let mut state = self.lock();
        if state.users.values().any(|u| u.email == new_user.email) {
            return Err(RepoError::Conflict(constraints::USER_EMAIL.into()));
        }
        if state.users.values().any(|u| u.username == new_user.username) {
            return Err(RepoError::Conflict(constraints::USER_USERNAME.into()));
        }
        let user = User {
            id: next(&mut state.seq.users),
            email: new_user.email,
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            password_hash: new_user.password_hash,
            is_staff: false,
            date_joined: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        Ok(self.lock().users.values().any(|u| u.email == email))
    }

    async fn username_exists(&self, username: &str) -> RepoResult<bool> {
        Ok(self.lock().users.values().any(|u| u.username == username))
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn get_or_create(&self, user_id: i64, candidate: &str) -> RepoResult<String> {
        let mut state = self.lock();
        Ok(state
            .tokens
            .entry(user_id)
            .or_insert_with(|| candidate.to_string())
            .clone())
    }

    async fn is_active(&self, user_id: i64, key: &str) -> RepoResult<bool> {
        Ok(self.lock().tokens.get(&user_id).is_some_and(|k| k == key))
    }

    async fn revoke(&self, user_id: i64) -> RepoResult<bool> {
        Ok(self.lock().tokens.remove(&user_id).is_some())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn create(
        &self,
        user_id: i64,
        picture: Option<String>,
        bio: Option<String>,
    ) -> RepoResult<Profile> {
        let mut state = self.lock();
        if state.profiles.values().any(|p| p.user_id == user_id) {
            return Err(RepoError::Conflict(constraints::PROFILE_USER.into()));
        }
        let profile = Profile {
            id: next(&mut state.seq.profiles),
            user_id,
            picture,
            bio,
        };
        state.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn exists_for_user(&self, user_id: i64) -> RepoResult<bool> {
        Ok(self.lock().profiles.values().any(|p| p.user_id == user_id))
    }

    async fn find(&self, id: i64) -> RepoResult<Option<ProfileWithUser>> {
        let state = self.lock();
        Ok(state.profiles.get(&id).and_then(|profile| {
            state.users.get(&profile.user_id).map(|user| ProfileWithUser {
                profile: profile.clone(),
                user: user.clone(),
            })
        }))
    }

    async fn list(&self, filter: &ProfileFilter) -> RepoResult<Vec<ProfileWithUser>> {
        let state = self.lock();
        Ok(state
            .profiles
            .values()
            .filter_map(|profile| {
                let user = state.users.get(&profile.user_id)?;
                if filter.user_id.is_some_and(|id| id != user.id) {
                    return None;
                }
                if let Some(username) = &filter.username {
                    if !icontains(&user.username, username) {
                        return None;
                    }
                }
                if let Some(first_name) = &filter.first_name {
                    if !icontains(&user.first_name, first_name) {
                        return None;
                    }
                }
                if let Some(last_name) = &filter.last_name {
                    if !icontains(&user.last_name, last_name) {
                        return None;
                    }
                }
                if let Some((start, end)) = filter.joined {
                    if user.date_joined < start || user.date_joined >= end {
                        return None;
                    }
                }
                Some(ProfileWithUser {
                    profile: profile.clone(),
                    user: user.clone(),
                })
            })
            .collect())
    }

    async fn update(&self, id: i64, changes: ProfileChanges) -> RepoResult<Option<Profile>> {
        let mut state = self.lock();
        Ok(state.profiles.get_mut(&id).map(|profile| {
            if let Some(picture) = changes.picture {
                profile.picture = Some(picture);
            }
            if let Some(bio) = changes.bio {
                profile.bio = Some(bio);
            }
            profile.clone()
        }))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        Ok(self.lock().profiles.remove(&id).is_some())
    }
}

#[async_trait]
impl FollowRepository for MemoryStore {
    async fn create(&self, follower_id: i64, followee_id: i64) -> RepoResult<Follow> {
        let mut state = self.lock();
        if follower_id == followee_id {
            return Err(RepoError::Conflict(constraints::FOLLOWER_NOT_FOLLOWEE.into()));
        }
        if !state.users.contains_key(&followee_id) {
            return Err(RepoError::NotFound);
        }
        if state
            .follows
            .values()
            .any(|f| f.follower_id == follower_id && f.followee_id == followee_id)
        {
            return Err(RepoError::Conflict(constraints::UNIQUE_FOLLOW.into()));
        }
        let follow = Follow {
            id: next(&mut state.seq.follows),
            follower_id,
            followee_id,
            created_at: Utc::now(),
        };
        state.follows.insert(follow.id, follow.clone());
        Ok(follow)
    }

    async fn find_for_follower(&self, id: i64, follower_id: i64) -> RepoResult<Option<FollowView>> {
        let state = self.lock();
        Ok(state
            .follows
            .get(&id)
            .filter(|f| f.follower_id == follower_id)
            .map(|f| state.follow_view(f)))
    }

    async fn list_for_follower(&self, follower_id: i64) -> RepoResult<Vec<FollowView>> {
        let state = self.lock();
        let mut rows: Vec<FollowView> = state
            .follows
            .values()
            .filter(|f| f.follower_id == follower_id)
            .map(|f| state.follow_view(f))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn delete_for_follower(&self, id: i64, follower_id: i64) -> RepoResult<bool> {
        let mut state = self.lock();
        if state.follows.get(&id).is_some_and(|f| f.follower_id == follower_id) {
            state.follows.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn following_usernames(&self, user_id: i64) -> RepoResult<Vec<String>> {
        Ok(self
            .list_for_follower(user_id)
            .await?
            .into_iter()
            .map(|f| f.followee)
            .collect())
    }

    async fn follower_usernames(&self, user_id: i64) -> RepoResult<Vec<String>> {
        let state = self.lock();
        let mut rows: Vec<&Follow> = state
            .follows
            .values()
            .filter(|f| f.followee_id == user_id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows.into_iter().map(|f| state.username(f.follower_id)).collect())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create(&self, new_post: NewPost) -> RepoResult<Post> {
        let mut state = self.lock();
        let now = Utc::now();
        let post = Post {
            id: next(&mut state.seq.posts),
            author_id: new_post.author_id,
            content: new_post.content,
            created_at: now,
            is_published: new_post.is_published,
            time_to_publicate: new_post.time_to_publicate,
        };
        state.posts.insert(post.id, post.clone());
        state.link_hashtags(post.id, &new_post.hashtags);
        if let Some(picture) = new_post.image {
            let image = Image {
                id: next(&mut state.seq.images),
                post_id: post.id,
                picture,
                created_at: now,
            };
            state.images.insert(image.id, image);
        }
        Ok(post)
    }

    async fn find(&self, id: i64) -> RepoResult<Option<PostDetail>> {
        let state = self.lock();
        Ok(state.posts.get(&id).map(|p| state.post_detail(p)))
    }

    async fn list(&self, query: &PostQuery) -> RepoResult<Vec<PostDetail>> {
        let state = self.lock();
        let mut posts: Vec<&Post> = state
            .posts
            .values()
            .filter(|p| state.matches(p, query))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts.into_iter().map(|p| state.post_detail(p)).collect())
    }

    async fn update(&self, id: i64, changes: PostChanges) -> RepoResult<Option<PostDetail>> {
        let mut state = self.lock();
        let Some(post) = state.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(hashtags) = changes.hashtags {
            state.post_hashtags.retain(|(post_id, _)| *post_id != id);
            state.link_hashtags(id, &hashtags);
        }
        Ok(state.posts.get(&id).map(|p| state.post_detail(p)))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut state = self.lock();
        if state.posts.remove(&id).is_none() {
            return Ok(false);
        }
        state.post_hashtags.retain(|(post_id, _)| *post_id != id);
        state.images.retain(|_, img| img.post_id != id);
        state.comments.retain(|_, c| c.post_id != id);
        state.likes.retain(|_, l| l.post_id != id);
        Ok(true)
    }

    async fn add_image(&self, post_id: i64, picture: &str) -> RepoResult<Image> {
        let mut state = self.lock();
        if !state.posts.contains_key(&post_id) {
            return Err(RepoError::NotFound);
        }
        let image = Image {
            id: next(&mut state.seq.images),
            post_id,
            picture: picture.to_string(),
            created_at: Utc::now(),
        };
        state.images.insert(image.id, image.clone());
        Ok(image)
    }

    async fn publish(&self, id: i64) -> RepoResult<bool> {
        let mut state = self.lock();
        Ok(state
            .posts
            .get_mut(&id)
            .map(|post| post.is_published = true)
            .is_some())
    }

    async fn pending_publications(&self) -> RepoResult<Vec<(i64, DateTime<Utc>)>> {
        let state = self.lock();
        let mut pending: Vec<(i64, DateTime<Utc>)> = state
            .posts
            .values()
            .filter(|p| !p.is_published)
            .filter_map(|p| p.time_to_publicate.map(|at| (p.id, at)))
            .collect();
        pending.sort_by_key(|(_, at)| *at);
        Ok(pending)
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, reviewer_id: i64, post_id: i64, content: &str) -> RepoResult<Comment> {
        let mut state = self.lock();
        if !state.posts.contains_key(&post_id) {
            return Err(RepoError::NotFound);
        }
        let comment = Comment {
            id: next(&mut state.seq.comments),
            reviewer_id,
            post_id,
            content: content.to_string(),
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find(&self, id: i64) -> RepoResult<Option<Comment>> {
        Ok(self.lock().comments.get(&id).cloned())
    }

    async fn list(&self, filter: &CommentFilter) -> RepoResult<Vec<Comment>> {
        let state = self.lock();
        Ok(state
            .comments
            .values()
            .filter(|c| filter.post_id.is_none_or(|id| id == c.post_id))
            .filter(|c| filter.reviewer_id.is_none_or(|id| id == c.reviewer_id))
            .filter(|c| {
                filter
                    .reviewer
                    .as_deref()
                    .is_none_or(|name| icontains(&state.username(c.reviewer_id), name))
            })
            .cloned()
            .collect())
    }

    async fn update_content(&self, id: i64, content: &str) -> RepoResult<Option<Comment>> {
        let mut state = self.lock();
        Ok(state.comments.get_mut(&id).map(|c| {
            c.content = content.to_string();
            c.clone()
        }))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        Ok(self.lock().comments.remove(&id).is_some())
    }
}

#[async_trait]
impl LikeRepository for MemoryStore {
    async fn create(&self, post_id: i64, reviewer_id: i64, is_likes: bool) -> RepoResult<Like> {
        let mut state = self.lock();
        if !state.posts.contains_key(&post_id) {
            return Err(RepoError::NotFound);
        }
        if state
            .likes
            .values()
            .any(|l| l.post_id == post_id && l.reviewer_id == reviewer_id)
        {
            return Err(RepoError::Conflict(constraints::UNIQUE_LIKE.into()));
        }
        let like = Like {
            id: next(&mut state.seq.likes),
            post_id,
            reviewer_id,
            is_likes,
        };
        state.likes.insert(like.id, like.clone());
        Ok(like)
    }

    async fn find(&self, id: i64) -> RepoResult<Option<Like>> {
        Ok(self.lock().likes.get(&id).cloned())
    }

    async fn find_for(&self, post_id: i64, reviewer_id: i64) -> RepoResult<Option<Like>> {
        Ok(self
            .lock()
            .likes
            .values()
            .find(|l| l.post_id == post_id && l.reviewer_id == reviewer_id)
            .cloned())
    }

    async fn list(&self, filter: &LikeFilter) -> RepoResult<Vec<Like>> {
        Ok(self
            .lock()
            .likes
            .values()
            .filter(|l| filter.post_id.is_none_or(|id| id == l.post_id))
            .cloned()
            .collect())
    }

    async fn set_is_likes(&self, id: i64, is_likes: bool) -> RepoResult<Option<Like>> {
        let mut state = self.lock();
        Ok(state.likes.get_mut(&id).map(|l| {
            l.is_likes = is_likes;
            l.clone()
        }))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        Ok(self.lock().likes.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            email: format!("{}@example.com", name),
            username: name.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_reports_constraint() {
        let store = MemoryStore::new();
        store.create_user(new_user("ann")).await.unwrap();
        let mut dup = new_user("other");
        dup.email = "ann@example.com".into();
        let err = store.create_user(dup).await.unwrap_err();
        assert!(err.is_conflict_on(constraints::USER_EMAIL));
    }

    #[tokio::test]
    async fn hashtags_are_shared_between_posts() {
        let store = MemoryStore::new();
        let author = store.create_user(new_user("ann")).await.unwrap();
        for content in ["one", "two"] {
            PostRepository::create(
                &store,
                NewPost {
                    author_id: author.id,
                    content: content.into(),
                    is_published: true,
                    time_to_publicate: None,
                    hashtags: vec!["rust".into()],
                    image: None,
                },
            )
            .await
            .unwrap();
        }
        let state = store.lock();
        assert_eq!(state.hashtags.len(), 1);
        assert_eq!(state.post_hashtags.len(), 2);
    }

    #[tokio::test]
    async fn deleting_a_post_cascades() {
        let store = MemoryStore::new();
        let author = store.create_user(new_user("ann")).await.unwrap();
        let fan = store.create_user(new_user("bob")).await.unwrap();
        let post = PostRepository::create(
            &store,
            NewPost {
                author_id: author.id,
                content: "hello".into(),
                is_published: true,
                time_to_publicate: None,
                hashtags: vec![],
                image: Some("2024/01/01/a.png".into()),
            },
        )
        .await
        .unwrap();
        CommentRepository::create(&store, fan.id, post.id, "nice").await.unwrap();
        LikeRepository::create(&store, post.id, fan.id, true).await.unwrap();

        assert!(PostRepository::delete(&store, post.id).await.unwrap());
        let state = store.lock();
        assert!(state.images.is_empty());
        assert!(state.comments.is_empty());
        assert!(state.likes.is_empty());
    }

    #[tokio::test]
    async fn writes_against_vanished_rows_are_not_found() {
        let store = MemoryStore::new();
        let fan = store.create_user(new_user("bob")).await.unwrap();
        assert!(matches!(
            LikeRepository::create(&store, 404, fan.id, true).await,
            Err(RepoError::NotFound)
        ));
        assert!(matches!(
            CommentRepository::create(&store, fan.id, 404, "hi").await,
            Err(RepoError::NotFound)
        ));
        assert!(matches!(
            FollowRepository::create(&store, fan.id, 404).await,
            Err(RepoError::NotFound)
        ));
    }
}
