//! Social feed core: feed assembly over a document store, the follow graph,
//! and synthetic repost generation.

pub mod config;
pub mod domain;
pub mod error;
pub mod maintenance;
pub mod services;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};

pub use domain::{BoundingBox, FeedEntry, GeoPoint, Post, Repost, User};
pub use services::{
    FeedAssembler, FeedSubscription, FollowService, PostService, RepostSynthesizer,
    SnippetGenerator, SuggestionService, SynthesisReport, UserService,
};
pub use store::{DocumentStore, MemoryStore, StoreError};
