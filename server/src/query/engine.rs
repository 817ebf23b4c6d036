//! Filtering, slicing and lookup over a collection snapshot.

use super::{ListMode, ListQuery, Page, QueryError, QueryResult};
use crate::storage::{Item, ItemId};

/// Answer a list request against `collection`.
///
/// Filtering keeps collection order, so a fixed collection always yields the
/// same slice for the same page. A page mode with a zero page or page size
/// lists everything, matching the fallback used when resolving parameters.
pub fn query(collection: &[Item], query: &ListQuery) -> QueryResult {
    let filtered = filter_by_name(collection, query.search.as_deref());

    match query.mode {
        ListMode::Page { page, page_size } if page > 0 && page_size > 0 => {
            QueryResult::Page(paginate(&filtered, page, page_size))
        }
        ListMode::Limit(limit) => {
            QueryResult::Items(filtered.into_iter().take(limit).cloned().collect())
        }
        _ => QueryResult::Items(filtered.into_iter().cloned().collect()),
    }
}

/// Items whose name contains `search`, ignoring case
fn filter_by_name<'a>(collection: &'a [Item], search: Option<&str>) -> Vec<&'a Item> {
    match search {
        Some(term) if !term.is_empty() => {
            let needle = term.to_lowercase();
            collection
                .iter()
                .filter(|item| item.name.to_lowercase().contains(&needle))
                .collect()
        }
        _ => collection.iter().collect(),
    }
}

fn paginate(filtered: &[&Item], page: usize, page_size: usize) -> Page {
    let total = filtered.len();
    let start = (page - 1).saturating_mul(page_size);

    let data = filtered
        .iter()
        .skip(start)
        .take(page_size)
        .map(|item| (*item).clone())
        .collect();

    Page {
        data,
        total,
        page,
        page_size,
        total_pages: total.div_ceil(page_size),
    }
}

/// Exact id lookup
pub fn find_by_id(collection: &[Item], id: ItemId) -> Result<&Item, QueryError> {
    collection
        .iter()
        .find(|item| item.id == id)
        .ok_or_else(|| QueryError::not_found(id))
}

/// Parse an id path segment; anything that is not an integer cannot match
pub fn parse_item_id(raw: &str) -> Result<ItemId, QueryError> {
    raw.trim()
        .parse::<ItemId>()
        .map_err(|_| QueryError::NotFound(raw.to_string()))
}
