use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Page counts up to this size are listed in full.
pub const MAX_UNFOLDED_PAGES: u32 = 5;
const WINDOW_RADIUS: u32 = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

impl Display for PageItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PageItem::Page(n) => write!(f, "{n}"),
            PageItem::Ellipsis => write!(f, "..."),
        }
    }
}

/// Page numbers to show for `current` out of `total_pages`: everything for
/// short lists, otherwise the first and last page plus the current page and
/// its neighbours. Gaps of one page show that page instead of an ellipsis.
pub fn page_window(current: u32, total_pages: u32) -> Vec<PageItem> {
    if total_pages == 0 {
        return vec![];
    }
    let current = current.clamp(1, total_pages);
    if total_pages <= MAX_UNFOLDED_PAGES {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let low = current.saturating_sub(WINDOW_RADIUS).max(1);
    let high = current.saturating_add(WINDOW_RADIUS).min(total_pages);
    let mut pages: BTreeSet<u32> = (low..=high).collect();
    pages.insert(1);
    pages.insert(total_pages);

    let mut items = Vec::with_capacity(pages.len() + 2);
    let mut previous = 0;
    for page in pages {
        match page - previous {
            1 => {}
            2 => items.push(PageItem::Page(previous + 1)),
            _ if previous > 0 => items.push(PageItem::Ellipsis),
            _ => {}
        }
        items.push(PageItem::Page(page));
        previous = page;
    }
    items
}
