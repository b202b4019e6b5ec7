//! Lazy prefix listing

use crate::error::Result;
use crate::storage::{ListPage, ObjectStore};
use futures::Stream;

/// Walks a prefix listing one page at a time.
///
/// A page is only requested when the caller asks for it, and the paginator
/// stops as soon as a page arrives without a continuation token. If a list
/// call fails, the next call retries the same page.
pub struct Paginator<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
    prefix: &'a str,
    next_token: Option<String>,
    finished: bool,
    pages_fetched: usize,
}

impl<'a> Paginator<'a> {
    /// Create a paginator over `bucket/prefix`
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str, prefix: &'a str) -> Self {
        Self {
            store,
            bucket,
            prefix,
            next_token: None,
            finished: false,
            pages_fetched: 0,
        }
    }

    /// Fetch the next page, or `None` once the listing is exhausted
    pub async fn next_page(&mut self) -> Result<Option<ListPage>> {
        if self.finished {
            return Ok(None);
        }

        let page = self
            .store
            .list_page(self.bucket, self.prefix, self.next_token.clone())
            .await?;
        self.pages_fetched += 1;

        tracing::debug!(
            "Listed page {} of s3://{}/{} ({} keys, more: {})",
            self.pages_fetched,
            self.bucket,
            self.prefix,
            page.keys.len(),
            page.next_token.is_some()
        );

        match &page.next_token {
            Some(token) => self.next_token = Some(token.clone()),
            None => self.finished = true,
        }
        Ok(Some(page))
    }

    /// Number of list calls that succeeded
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Check if the last page has been returned
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Turn the paginator into a stream of pages
    pub fn into_stream(self) -> impl Stream<Item = Result<ListPage>> + 'a {
        futures::stream::try_unfold(self, |mut pager| async move {
            Ok(pager.next_page().await?.map(|page| (page, pager)))
        })
    }
}
