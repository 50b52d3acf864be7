//! Client-side application state.
//!
//! `AppState` is an immutable value: every transition borrows the current
//! state and returns a new one, so views holding an older state never see it
//! change underneath them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::{FeedEntry, Post};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    current_user: Option<SessionUser>,
    usernames: BTreeMap<String, String>,
    posts_by_author: BTreeMap<String, Vec<Post>>,
    following: BTreeMap<String, BTreeSet<String>>,
    followers: BTreeMap<String, BTreeSet<String>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<&SessionUser> {
        self.current_user.as_ref()
    }

    pub fn username(&self, user_id: &str) -> Option<&str> {
        self.usernames.get(user_id).map(String::as_str)
    }

    pub fn following(&self, user_id: &str) -> BTreeSet<String> {
        self.following.get(user_id).cloned().unwrap_or_default()
    }

    pub fn followers(&self, user_id: &str) -> BTreeSet<String> {
        self.followers.get(user_id).cloned().unwrap_or_default()
    }

    pub fn with_current_user(&self, user: Option<SessionUser>) -> Self {
        let mut next = self.clone();
        if let Some(user) = &user {
            next.usernames.insert(user.id.clone(), user.username.clone());
        }
        next.current_user = user;
        next
    }

    pub fn with_user(&self, user_id: &str, username: &str) -> Self {
        let mut next = self.clone();
        next.usernames
            .insert(user_id.to_string(), username.to_string());
        next
    }

    /// Add or replace a post (matched by id).
    pub fn with_post(&self, post: Post) -> Self {
        let mut next = self.clone();
        let posts = next.posts_by_author.entry(post.author_id.clone()).or_default();
        posts.retain(|existing| existing.id != post.id);
        posts.push(post);
        next
    }

    pub fn with_follow(&self, follower_id: &str, followee_id: &str) -> Self {
        if !is_graph_edge(follower_id, followee_id) {
            return self.clone();
        }
        let mut next = self.clone();
        next.following
            .entry(follower_id.to_string())
            .or_default()
            .insert(followee_id.to_string());
        next.followers
            .entry(followee_id.to_string())
            .or_default()
            .insert(follower_id.to_string());
        next
    }

    pub fn without_follow(&self, follower_id: &str, followee_id: &str) -> Self {
        if !is_graph_edge(follower_id, followee_id) {
            return self.clone();
        }
        let mut next = self.clone();
        remove_member(&mut next.following, follower_id, followee_id);
        remove_member(&mut next.followers, followee_id, follower_id);
        next
    }

    /// Every known post, newest first.
    pub fn all_posts(&self) -> Vec<FeedEntry> {
        self.entries(self.posts_by_author.values().flatten())
    }

    /// Posts by the users `user_id` follows, newest first.
    pub fn feed_for(&self, user_id: &str) -> Vec<FeedEntry> {
        let Some(followees) = self.following.get(user_id) else {
            return Vec::new();
        };
        self.entries(
            followees
                .iter()
                .filter_map(|id| self.posts_by_author.get(id))
                .flatten(),
        )
    }

    fn entries<'a>(&self, posts: impl Iterator<Item = &'a Post>) -> Vec<FeedEntry> {
        let mut entries: Vec<FeedEntry> = posts
            .map(|post| {
                let mut post = post.clone();
                if post.author_username.is_none() {
                    post.author_username = self.usernames.get(&post.author_id).cloned();
                }
                FeedEntry::from(post)
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        entries
    }
}

fn is_graph_edge(follower_id: &str, followee_id: &str) -> bool {
    !follower_id.is_empty() && !followee_id.is_empty() && follower_id != followee_id
}

fn remove_member(map: &mut BTreeMap<String, BTreeSet<String>>, key: &str, member: &str) {
    if let Some(set) = map.get_mut(key) {
        set.remove(member);
        if set.is_empty() {
            map.remove(key);
        }
    }
}
