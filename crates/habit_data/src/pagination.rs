use tracing::{debug, info};

use crate::error::Result;
use crate::store::{Record, TableStore};

pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Reads `table` page by page until a short or empty page comes back.
pub fn fetch_all_paginated<S>(store: &S, table: &str, page_size: usize) -> Result<Vec<Record>>
where
    S: TableStore + ?Sized,
{
    let page_size = page_size.max(1);
    let mut records = Vec::new();
    let mut batches = 0usize;
    loop {
        let page = store.fetch_page(table, records.len(), page_size)?;
        if page.is_empty() {
            break;
        }
        batches += 1;
        let short = page.len() < page_size;
        records.extend(page);
        if short {
            break;
        }
        debug!(table, batch = batches, so_far = records.len(), "fetching next page");
    }
    if !records.is_empty() {
        info!(table, records = records.len(), batches, "table fetched");
    }
    Ok(records)
}
