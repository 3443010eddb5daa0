//! Independent pagination for the per-category tabs.

use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based, clamped into `1..=total_pages`.
    pub number: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Slice `items` into the requested page. A zero `page_size` falls back to
/// `default_size`; out-of-range page numbers are clamped.
pub fn paginate<T>(
    items: &[T],
    number: usize,
    page_size: usize,
    default_size: usize,
) -> Page<'_, T> {
    let page_size = match (page_size, default_size) {
        (0, 0) => 1,
        (0, fallback) => fallback,
        (size, _) => size,
    };
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let number = number.clamp(1, total_pages);

    let start = ((number - 1) * page_size).min(total_items);
    let end = (start + page_size).min(total_items);

    Page {
        items: &items[start..end],
        number,
        page_size,
        total_items,
        total_pages,
    }
}
