use crate::query::{QueryFilters, ViewScope};
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EmptyState {
    /// Nothing matches, but clearing the filters would show something.
    FiltersActive,
    NoListings { offer_create: bool },
}

impl EmptyState {
    pub fn for_view(filters: &QueryFilters, scope: &ViewScope) -> Self {
        if filters.has_active_filters() {
            EmptyState::FiltersActive
        } else {
            EmptyState::NoListings {
                offer_create: !scope.is_foreign(),
            }
        }
    }
}

impl Display for EmptyState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptyState::FiltersActive => {
                write!(f, "No products match your filters. [clear filters]")
            }
            EmptyState::NoListings { offer_create: true } => {
                write!(f, "No products yet. [create the first listing]")
            }
            EmptyState::NoListings { offer_create: false } => {
                write!(f, "This seller has no listings.")
            }
        }
    }
}
