pub mod feed;
pub mod follow;
pub mod geo;
pub mod posts;
pub mod repost;
pub mod snippet;
pub mod suggestions;
pub mod users;

pub use feed::{FeedAssembler, FeedSubscription};
pub use follow::FollowService;
pub use geo::sample_coordinate;
pub use posts::PostService;
pub use repost::{DefaultNaming, RepostNaming, RepostSynthesizer, SynthesisReport};
pub use snippet::SnippetGenerator;
pub use suggestions::SuggestionService;
pub use users::UserService;
