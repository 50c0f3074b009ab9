pub mod github;
pub mod opslevel;
#[cfg(feature = "s3")]
pub mod s3;
pub mod slack;

pub use github::GitHubClient;
pub use opslevel::OpsLevelClient;
#[cfg(feature = "s3")]
pub use s3::S3SchemaStore;
pub use slack::SlackClient;
