//! The catalog query pipeline: filter, search, sort and paginate an
//! in-memory snapshot of published tutorials.
//!
//! The stages always run in that order. `CatalogView` holds the browsing
//! cursor and resets it to the first page whenever a filter, the search
//! text or the sort order changes.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalization::compare_titles;
use crate::tutorial::{Difficulty, Tutorial};

/// The reserved filter value meaning “no filtering on this dimension”.
pub const ALL: &str = "all";

/// The number of tutorials per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 6;

/// Tags that mark a tutorial as a candidate for the featured list.
const FEATURED_TAGS: &[&str] = &["React", "Next.js"];

/// An exact-match filter on one field.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Filter {
    All,
    Only(String),
}

impl Filter {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(wanted) => wanted == value,
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

impl From<String> for Filter {
    fn from(value: String) -> Self {
        if value.is_empty() || value == ALL {
            Filter::All
        } else {
            Filter::Only(value)
        }
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        Filter::from(value.to_owned())
    }
}

impl From<Option<String>> for Filter {
    fn from(value: Option<String>) -> Self {
        value.map(Filter::from).unwrap_or_default()
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::All => ALL.to_owned(),
            Filter::Only(value) => value,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SortOption {
    #[serde(rename = "title-asc")]
    TitleAscending,
    #[serde(rename = "title-desc")]
    TitleDescending,
    #[serde(rename = "difficulty-asc")]
    DifficultyAscending,
    #[serde(rename = "difficulty-desc")]
    DifficultyDescending,
}

impl SortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::TitleAscending => "title-asc",
            SortOption::TitleDescending => "title-desc",
            SortOption::DifficultyAscending => "difficulty-asc",
            SortOption::DifficultyDescending => "difficulty-desc",
        }
    }
}

impl Default for SortOption {
    fn default() -> Self {
        SortOption::TitleAscending
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of results.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,

    /// The 1-based page number these items belong to.
    pub page: usize,

    /// Never less than 1, even when there are no items at all.
    pub total_pages: usize,

    /// The number of items across all pages.
    pub total: usize,
}

pub fn filter_by_category(records: Vec<Tutorial>, category: &Filter) -> Vec<Tutorial> {
    retain(records, |t| category.matches(&t.category))
}

pub fn filter_by_difficulty(records: Vec<Tutorial>, difficulty: &Filter) -> Vec<Tutorial> {
    retain(records, |t| difficulty.matches(t.difficulty.as_str()))
}

pub fn filter_by_language(records: Vec<Tutorial>, language: &Filter) -> Vec<Tutorial> {
    retain(records, |t| language.matches(&t.language))
}

/// Case-insensitive substring search over titles and tags. An empty
/// query matches everything.
pub fn search_by_text(records: Vec<Tutorial>, query: &str) -> Vec<Tutorial> {
    if query.is_empty() {
        return records;
    }

    let needle = query.to_lowercase();

    retain(records, |t| {
        t.title.to_lowercase().contains(&needle)
            || t.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
    })
}

/// Returns a sorted copy of `records`. The sort is stable, and tutorials
/// with an unrecognized difficulty always come after the known levels.
pub fn sort(records: &[Tutorial], option: SortOption) -> Vec<Tutorial> {
    let mut sorted = records.to_vec();

    match option {
        SortOption::TitleAscending => sorted.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortOption::TitleDescending => sorted.sort_by(|a, b| compare_titles(&b.title, &a.title)),
        SortOption::DifficultyAscending => {
            sorted.sort_by(|a, b| compare_difficulty(&a.difficulty, &b.difficulty, false))
        }
        SortOption::DifficultyDescending => {
            sorted.sort_by(|a, b| compare_difficulty(&a.difficulty, &b.difficulty, true))
        }
    }

    sorted
}

/// Slices out page `page_number` (1-based). Out-of-range pages come back
/// empty; clamping is up to the caller.
pub fn paginate<T: Clone>(records: &[T], page_size: usize, page_number: usize) -> Page<T> {
    let total = records.len();
    let total_pages = total_pages(total, page_size);

    let items = if page_size == 0 || page_number == 0 {
        vec![]
    } else {
        let start = (page_number - 1).saturating_mul(page_size);

        records
            .iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect()
    };

    Page {
        items,
        page: page_number,
        total_pages,
        total,
    }
}

/// `ceil(count / page_size)`, but at least 1.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }

    let pages = count / page_size + if count % page_size == 0 { 0 } else { 1 };

    pages.max(1)
}

/// The distinct languages present, sorted.
pub fn available_languages(records: &[Tutorial]) -> Vec<String> {
    records
        .iter()
        .map(|t| t.language.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Groups tutorials by category, with categories in name order and each
/// group keeping the input order.
pub fn group_by_category(records: Vec<Tutorial>) -> BTreeMap<String, Vec<Tutorial>> {
    let mut groups: BTreeMap<String, Vec<Tutorial>> = BTreeMap::new();

    for tutorial in records {
        groups
            .entry(tutorial.category.clone())
            .or_default()
            .push(tutorial);
    }

    groups
}

/// The first `count` tutorials tagged with one of the featured tags.
pub fn featured(records: Vec<Tutorial>, count: usize) -> Vec<Tutorial> {
    records
        .into_iter()
        .filter(|t| t.tags.iter().any(|tag| FEATURED_TAGS.contains(&tag.as_str())))
        .take(count)
        .collect()
}

fn retain(mut records: Vec<Tutorial>, keep: impl Fn(&Tutorial) -> bool) -> Vec<Tutorial> {
    records.retain(|t| keep(t));
    records
}

// unknown difficulties compare greater than every known one and equal
// to each other in either direction, which keeps them last and in input
// order
fn compare_difficulty(a: &Difficulty, b: &Difficulty, descending: bool) -> Ordering {
    match (a.rank(), b.rank()) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The state of one browsing session over the catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogView {
    category: Filter,
    difficulty: Filter,
    language: Filter,
    search: String,
    sort: SortOption,
    page: usize,
    page_size: usize,
}

impl CatalogView {
    pub fn new(page_size: usize) -> Self {
        CatalogView {
            category: Filter::All,
            difficulty: Filter::All,
            language: Filter::All,
            search: String::new(),
            sort: SortOption::default(),
            page: 1,
            page_size,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn category(&self) -> &Filter {
        &self.category
    }

    pub fn set_category(&mut self, category: Filter) {
        if self.category != category {
            self.category = category;
            self.page = 1;
        }
    }

    pub fn set_difficulty(&mut self, difficulty: Filter) {
        if self.difficulty != difficulty {
            self.difficulty = difficulty;
            self.page = 1;
        }
    }

    pub fn set_language(&mut self, language: Filter) {
        if self.language != language {
            self.language = language;
            self.page = 1;
        }
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        let search = search.into();

        if self.search != search {
            self.search = search;
            self.page = 1;
        }
    }

    pub fn set_sort(&mut self, sort: SortOption) {
        if self.sort != sort {
            self.sort = sort;
            self.page = 1;
        }
    }

    /// Resets every filter to “all”; the page goes back to 1.
    pub fn clear_filters(&mut self) {
        self.category = Filter::All;
        self.difficulty = Filter::All;
        self.language = Filter::All;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Runs the whole pipeline over `records`, clamping the current page
    /// into the range of pages that exist.
    pub fn apply(&self, records: Vec<Tutorial>) -> Page<Tutorial> {
        let records = filter_by_category(records, &self.category);
        let records = filter_by_difficulty(records, &self.difficulty);
        let records = filter_by_language(records, &self.language);
        let records = search_by_text(records, &self.search);
        let records = sort(&records, self.sort);

        let last = total_pages(records.len(), self.page_size);
        let page = self.page.max(1).min(last);

        paginate(&records, self.page_size, page)
    }
}
