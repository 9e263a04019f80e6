//! Feed page types

use snapgram_types::{Post, PostId};

/// Posts per feed page
pub const DEFAULT_PAGE_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerConfig {
    pub page_size: usize,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One fetched page of the infinite feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub items: Vec<Post>,
    /// Id of the last item; `None` marks the end of the feed
    pub next_cursor: Option<PostId>,
}

impl FeedPage {
    pub fn from_items(items: Vec<Post>) -> Self {
        let next_cursor = items.last().map(|post| post.id.clone());
        Self { items, next_cursor }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Loaded pages, in fetch order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPages {
    pub pages: Vec<FeedPage>,
}

impl FeedPages {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Cursor for the next fetch; `None` before the first page
    pub fn next_cursor(&self) -> Option<&PostId> {
        self.pages.last().and_then(|page| page.next_cursor.as_ref())
    }

    /// False once an empty page was fetched
    pub fn has_next_page(&self) -> bool {
        self.pages
            .last()
            .map(|page| page.next_cursor.is_some())
            .unwrap_or(true)
    }

    pub fn push(&mut self, page: FeedPage) {
        self.pages.push(page);
    }

    /// All loaded posts in feed order
    pub fn items(&self) -> Vec<Post> {
        self.pages
            .iter()
            .flat_map(|page| page.items.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use snapgram_types::{FileId, UserId};

    fn post(id: &str) -> Post {
        Post {
            id: PostId::new(id),
            creator: UserId::new("u1"),
            caption: format!("caption {}", id),
            image_id: FileId::new("f1"),
            image_url: "memory://files/f1/preview".to_string(),
            location: None,
            tags: vec![],
            likes: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cursor_is_last_item() {
        let page = FeedPage::from_items(vec![post("p9"), post("p8"), post("p7")]);
        assert_eq!(page.next_cursor, Some(PostId::new("p7")));
    }

    #[test]
    fn test_empty_page_ends_feed() {
        let mut pages = FeedPages::default();
        assert!(pages.has_next_page());
        assert_eq!(pages.next_cursor(), None);

        pages.push(FeedPage::from_items(vec![post("p2")]));
        assert!(pages.has_next_page());
        assert_eq!(pages.next_cursor(), Some(&PostId::new("p2")));

        pages.push(FeedPage::from_items(vec![]));
        assert!(!pages.has_next_page());
        assert_eq!(pages.items().len(), 1);
    }
}
