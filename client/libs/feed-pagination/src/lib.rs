//! Cursor pagination for the infinite feed
//!
//! Pages are fetched by descending update time with the last post id of the
//! previous page as cursor. An empty page ends the feed.

mod page;
mod pager;
mod source;

pub use page::{FeedPage, FeedPages, PagerConfig, DEFAULT_PAGE_SIZE};
pub use pager::{FeedPager, FetchOutcome};
pub use source::PageSource;
