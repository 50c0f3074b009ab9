//! Lazy, restartable walk over paged listings.
//!
//! A listing is driven by a fetch closure taking the continuation token of
//! the page to load (`None` for the first page). The walk ends after a page
//! that carries no continuation token.

use crate::domain::model::Page;
use crate::utils::error::Result;
use std::future::Future;
use std::marker::PhantomData;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Start,
    Next(String),
    Exhausted,
}

pub struct Paginator<T, F, Fut>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    fetch: F,
    cursor: Cursor,
    pages_fetched: usize,
    _item: PhantomData<fn() -> T>,
}

impl<T, F, Fut> Paginator<T, F, Fut>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            cursor: Cursor::Start,
            pages_fetched: 0,
            _item: PhantomData,
        }
    }

    /// Items of the next page, or `None` once the listing is exhausted.
    ///
    /// A failed fetch leaves the cursor where it was, so the same page is
    /// requested again on the next call.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        let token = match &self.cursor {
            Cursor::Exhausted => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token.clone()),
        };

        let page = (self.fetch)(token).await?;
        self.pages_fetched += 1;
        self.cursor = match page.next {
            Some(next) if !next.is_empty() => Cursor::Next(next),
            _ => Cursor::Exhausted,
        };

        Ok(Some(page.items))
    }

    /// Rewinds to the first page.
    pub fn restart(&mut self) {
        self.cursor = Cursor::Start;
        self.pages_fetched = 0;
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Exhausted
    }

    /// Drains every remaining page into one vector.
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }
}
