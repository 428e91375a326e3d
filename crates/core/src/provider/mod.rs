pub mod episode_match;
mod opensubtitles;
mod podnapisi;
mod registry;
mod traits;
mod types;

pub use episode_match::{find_episode, find_range, EpisodeMatch, MatchKind};
pub use opensubtitles::OpenSubtitlesProvider;
pub use podnapisi::PodnapisiProvider;
pub use registry::Registry;
pub use traits::Provider;
pub use types::{DownloadOptions, DownloadedContent, ProviderError};
