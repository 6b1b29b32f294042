//! Offset pagination over a feed ordered newest first.
//!
//! Out-of-range pages are "not found" rather than clamped, so a bookmarked
//! link past the end 404s instead of silently showing another page. An empty
//! feed still has a valid, empty page 1.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("page {page} is out of range (total pages: {total_pages})")]
    OutOfRange { page: u32, total_pages: u32 },
    #[error("page {0} is before the first page")]
    BeforeFirst(i64),
    #[error("per_page must be positive")]
    ZeroPerPage,
}

impl From<PageError> for AppError {
    fn from(e: PageError) -> Self {
        match e {
            PageError::OutOfRange { .. } | PageError::BeforeFirst(_) => {
                AppError::NotFound("page")
            }
            PageError::ZeroPerPage => AppError::Internal(anyhow::anyhow!(e)),
        }
    }
}

/// `?page=` query parameter. Absent or non-numeric means the first page;
/// zero or negative numbers are out of range.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    pub fn number(&self) -> Result<u32, PageError> {
        let Some(n) = self.page.as_deref().and_then(|p| p.trim().parse::<i64>().ok()) else {
            return Ok(1);
        };
        if n < 1 {
            return Err(PageError::BeforeFirst(n));
        }
        // Anything past u32 is past the last page anyway.
        Ok(u32::try_from(n).unwrap_or(u32::MAX))
    }
}

/// Position of one page inside a collection of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageMeta {
    pub fn locate(total_items: u64, page: u32, per_page: u32) -> Result<Self, PageError> {
        if per_page == 0 {
            return Err(PageError::ZeroPerPage);
        }
        let total_pages = total_items.div_ceil(per_page as u64) as u32;
        let in_range = page >= 1 && (page <= total_pages || (page == 1 && total_pages == 0));
        if !in_range {
            return Err(PageError::OutOfRange { page, total_pages });
        }
        Ok(Self {
            page,
            per_page,
            total_items,
            total_pages,
            has_prev: page > 1,
            has_next: page < total_pages,
        })
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    pub fn limit(&self) -> u64 {
        self.per_page as u64
    }

    pub fn prev_page(&self) -> Option<u32> {
        self.has_prev.then(|| self.page - 1)
    }

    pub fn next_page(&self) -> Option<u32> {
        self.has_next.then(|| self.page + 1)
    }

    /// Page numbers for a pager widget. Always shows the first `left_edge`
    /// and last `right_edge` pages plus a window around the current one;
    /// `None` marks a gap.
    pub fn page_links(
        &self,
        left_edge: u32,
        left_current: u32,
        right_current: u32,
        right_edge: u32,
    ) -> Vec<Option<u32>> {
        let mut out = Vec::new();
        let mut last = 0;
        for num in 1..=self.total_pages {
            let near_current = num as i64 > self.page as i64 - left_current as i64 - 1
                && (num as i64) < self.page as i64 + right_current as i64;
            let shown = num <= left_edge
                || near_current
                || num as i64 > self.total_pages as i64 - right_edge as i64;
            if shown {
                if last + 1 != num {
                    out.push(None);
                }
                out.push(Some(num));
                last = num;
            }
        }
        out
    }
}

/// A page of items with its position.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub meta: PageMeta,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
    pub page_links: Vec<Option<u32>>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, meta: PageMeta) -> Self {
        Self {
            prev_page: meta.prev_page(),
            next_page: meta.next_page(),
            page_links: meta.page_links(1, 1, 2, 1),
            items,
            meta,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
            prev_page: self.prev_page,
            next_page: self.next_page,
            page_links: self.page_links,
        }
    }
}

/// Anything that can sit in the feed.
pub trait FeedItem {
    fn posted_at(&self) -> OffsetDateTime;
    fn feed_id(&self) -> Uuid;
}

/// Sorts `items` newest first (ties: higher id first) and cuts out `page`.
pub fn paginate<T: FeedItem>(
    mut items: Vec<T>,
    page: u32,
    per_page: u32,
) -> Result<Page<T>, PageError> {
    let meta = PageMeta::locate(items.len() as u64, page, per_page)?;
    items.sort_by(|a, b| {
        (b.posted_at(), b.feed_id()).cmp(&(a.posted_at(), a.feed_id()))
    });
    let page_items = items
        .into_iter()
        .skip(meta.offset() as usize)
        .take(meta.limit() as usize)
        .collect();
    Ok(Page::new(page_items, meta))
}
