use serde::Deserialize;

use crate::catalog::{CatalogView, Filter, SortOption};
use crate::saved::SavedStatus;

/// The query string of the browse route. Every parameter is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowseQuery {
    #[serde(default)]
    pub category: Filter,

    #[serde(default)]
    pub difficulty: Filter,

    #[serde(default)]
    pub language: Filter,

    #[serde(default)]
    pub q: String,

    #[serde(default)]
    pub sort: SortOption,

    #[serde(default)]
    pub page: Option<usize>,
}

impl BrowseQuery {
    pub fn into_view(self, page_size: usize) -> CatalogView {
        let mut view = CatalogView::new(page_size);

        view.set_category(self.category);
        view.set_difficulty(self.difficulty);
        view.set_language(self.language);
        view.set_search(self.q.trim());
        view.set_sort(self.sort);
        view.set_page(self.page.unwrap_or(1));

        view
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguagesQuery {
    #[serde(default)]
    pub category: Filter,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeaturedQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdate {
    pub status: SavedStatus,
}
