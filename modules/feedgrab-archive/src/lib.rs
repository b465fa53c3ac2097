pub mod dedup;
pub mod error;
pub mod extract;
pub mod html;
pub mod ingest;
pub mod normalize;
pub mod page;
pub mod pipeline;
pub mod scroll;
mod services;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use dedup::filter_new;
pub use error::{ArchiveError, Result};
pub use extract::{extract_records, sort_newest_first, ItemNode};
pub use html::{extract_captured, HtmlItem};
pub use ingest::ingest;
pub use normalize::HostMap;
pub use page::{CapturedItem, CapturedItems, ProfilePage};
pub use pipeline::{Pipeline, PipelineConfig, RunOutcome, RunState};
pub use scroll::{converge, Convergence, ScrollPolicy};
pub use services::chrome::ChromeLauncher;
pub use session::{open_profile, validate_profile, BrowserLauncher, SessionCookies, SessionSource};
pub use store::{ArticleStore, MemoryArticleStore, PgArticleStore};
