use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Display name used when a post carries no usable author name.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Post document (`posts` collection).
///
/// `author_username` is copied from the author's profile when the post is
/// written and is never refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    #[serde(default)]
    pub author_username: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Post fields supplied by the writer; the store assigns the identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub author_id: String,
    pub author_username: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Synthetic repost document (`reposts` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repost {
    pub id: String,
    pub original_post_id: String,
    pub author_username: String,
    pub highlighted_quote: String,
    pub repost_comment: String,
    #[serde(flatten)]
    pub location: GeoPoint,
    pub created_at: DateTime<Utc>,
}

/// User profile document (`users` collection).
///
/// The list fields behave like document arrays: union appends a value only
/// when absent, remove drops every occurrence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub followers: Vec<String>,
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub posts: Vec<String>,
    #[serde(default)]
    pub feed: Vec<String>,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Rectangular latitude/longitude range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Yongsan district, Seoul.
    pub const YONGSAN: BoundingBox = BoundingBox {
        min_lat: 37.525,
        max_lat: 37.555,
        min_lng: 126.960,
        max_lng: 126.995,
    };

    pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> ServiceResult<Self> {
        let bbox = Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Both ranges must be strictly increasing, with latitudes inside
    /// `[-90, 90]` and longitudes inside `[-180, 180]`.
    pub fn validate(&self) -> ServiceResult<()> {
        let finite = [self.min_lat, self.max_lat, self.min_lng, self.max_lng]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(ServiceError::Config(format!(
                "bounding box has non-finite bounds: {:?}",
                self
            )));
        }
        if self.min_lat >= self.max_lat {
            return Err(ServiceError::Config(format!(
                "bounding box latitude range is empty: [{}, {})",
                self.min_lat, self.max_lat
            )));
        }
        if self.min_lng >= self.max_lng {
            return Err(ServiceError::Config(format!(
                "bounding box longitude range is empty: [{}, {})",
                self.min_lng, self.max_lng
            )));
        }
        if self.min_lat < -90.0 || self.max_lat > 90.0 {
            return Err(ServiceError::Config(format!(
                "bounding box latitude range [{}, {}) is outside [-90, 90]",
                self.min_lat, self.max_lat
            )));
        }
        if self.min_lng < -180.0 || self.max_lng > 180.0 {
            return Err(ServiceError::Config(format!(
                "bounding box longitude range [{}, {}) is outside [-180, 180]",
                self.min_lng, self.max_lng
            )));
        }
        Ok(())
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..self.max_lat).contains(&point.lat)
            && (self.min_lng..self.max_lng).contains(&point.lng)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::YONGSAN
    }
}

/// A post as shown in a feed, with the author name already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Post> for FeedEntry {
    fn from(post: Post) -> Self {
        let author_username = post
            .author_username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string();

        Self {
            id: post.id,
            author_id: post.author_id,
            author_username,
            content: post.content,
            created_at: post.created_at,
        }
    }
}
