pub mod assets;
pub mod github;
pub mod http;

pub use assets::{Platform, select_best_asset};
pub use github::{GitHubClient, ReleaseSource};
