use super::SearchHit;
use serde::Serialize;

/// One page of ranked results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub results: Vec<SearchHit>,
    /// Results remain after this page
    pub has_more: bool,
    /// Size of the full ranked list the page was cut from
    pub total: usize,
}

/// Slice page `page` (1-based) of size `per_page` out of ranked results.
///
/// Page 0 is treated as page 1; a page past the end is empty.
pub fn paginate(results: &[SearchHit], page: usize, per_page: usize) -> Page {
    let total = results.len();
    let per_page = per_page.max(1);
    let start = page.max(1).saturating_sub(1).saturating_mul(per_page);
    let end = start.saturating_add(per_page).min(total);

    let results = if start < total {
        results[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        results,
        has_more: end < total,
        total,
    }
}
