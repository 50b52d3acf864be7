pub mod models;

pub use models::{
    BoundingBox, FeedEntry, GeoPoint, NewPost, Post, Repost, User, UNKNOWN_AUTHOR,
};
