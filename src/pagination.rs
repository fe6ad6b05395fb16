use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLimits {
    pub per_page: u32,
    pub max_pages: u32,
}

impl PageLimits {
    pub fn new(per_page: u32, max_pages: u32) -> Self {
        Self {
            per_page,
            max_pages,
        }
    }
}

/// Fetches pages in order starting at page 1 and concatenates them.
///
/// The walk ends at the first page holding fewer than `per_page` items, or
/// once `max_pages` pages have been fetched. Pages are requested one at a
/// time. The first failing page aborts the walk and its error is returned;
/// items gathered before the failure are dropped.
pub fn walk_pages<T, E, F>(limits: PageLimits, mut fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(u32) -> Result<Vec<T>, E>,
{
    let mut items = Vec::new();
    for page in 1..=limits.max_pages {
        let batch = fetch_page(page)?;
        let short = batch.len() < limits.per_page as usize;
        items.extend(batch);
        if short {
            debug!(page, total = items.len(), "reached final page");
            return Ok(items);
        }
    }
    debug!(
        max_pages = limits.max_pages,
        total = items.len(),
        "stopped at page cap"
    );
    Ok(items)
}
