//! Cursor pagination.

use serde::Serialize;

/// One page of a newest-first listing.
///
/// There is no total count: a page that came back full signals that older
/// items may exist, and the client asks again with the last item's ID as
/// `untilId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Build a page from the rows fetched with `limit`.
    #[must_use]
    pub fn new(items: Vec<T>, limit: u64) -> Self {
        let has_more = limit > 0 && items.len() as u64 >= limit;
        Self { items, has_more }
    }

    /// Transform the items, keeping the `has_more` flag.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            has_more: self.has_more,
        }
    }
}
