//! Filter and sort criteria, as chosen in the catalog page controls.

use crate::catalog_store::{CatalogEntry, Category, Difficulty};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A dropdown filter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    /// The `"all"` option.
    All,
    Only(T),
    /// A value outside the enumeration. Matches no entry.
    Unrecognized(String),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: PartialEq> Selection<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
            Selection::Unrecognized(_) => false,
        }
    }
}

impl<T: FromStr> Selection<T> {
    /// Parses a dropdown value; `"all"` (any case) selects everything.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Selection::All;
        }
        match trimmed.parse::<T>() {
            Ok(value) => Selection::Only(value),
            Err(_) => Selection::Unrecognized(trimmed.to_string()),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => write!(f, "all"),
            Selection::Only(value) => write!(f, "{}", value),
            Selection::Unrecognized(raw) => write!(f, "{}", raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Title,
    Composer,
    Difficulty,
    Price,
    Newest,
    /// Keep input order. Any sort value we do not know lands here.
    Unsorted,
}

impl SortKey {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "title" => SortKey::Title,
            "composer" => SortKey::Composer,
            "difficulty" => SortKey::Difficulty,
            "price" => SortKey::Price,
            "newest" => SortKey::Newest,
            _ => SortKey::Unsorted,
        }
    }
}

/// Inclusive band on `price.standard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u32,
    pub max: u32,
}

impl PriceRange {
    pub const UNDER_50: PriceRange = PriceRange { min: 0, max: 49 };
    pub const FROM_50_TO_99: PriceRange = PriceRange { min: 50, max: 99 };
    pub const FROM_100_TO_199: PriceRange = PriceRange { min: 100, max: 199 };
    pub const FROM_200: PriceRange = PriceRange { min: 200, max: 9999 };

    /// The bands offered by the catalog page, with their labels.
    pub const STANDARD_BANDS: [(&'static str, PriceRange); 4] = [
        ("Under $50", Self::UNDER_50),
        ("$50 - $99", Self::FROM_50_TO_99),
        ("$100 - $199", Self::FROM_100_TO_199),
        ("$200+", Self::FROM_200),
    ];

    pub fn contains(&self, price: u32) -> bool {
        (self.min..=self.max).contains(&price)
    }
}

impl FromStr for PriceRange {
    type Err = String;

    /// Accepts a band label (`"Under $50"`) or a `min-max` pair (`"50-99"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some((_, range)) = Self::STANDARD_BANDS
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(trimmed))
        {
            return Ok(*range);
        }
        let (min, max) = trimmed
            .split_once('-')
            .ok_or_else(|| format!("Invalid price range '{}'", trimmed))?;
        let min: u32 = min
            .trim()
            .parse()
            .map_err(|_| format!("Invalid price range minimum '{}'", min.trim()))?;
        let max: u32 = max
            .trim()
            .parse()
            .map_err(|_| format!("Invalid price range maximum '{}'", max.trim()))?;
        if min > max {
            return Err(format!("Price range minimum {} exceeds maximum {}", min, max));
        }
        Ok(PriceRange { min, max })
    }
}

/// The full filter state of one catalog view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogQuery {
    pub search_text: String,
    pub category: Selection<Category>,
    pub difficulty: Selection<Difficulty>,
    pub sort: SortKey,
    pub price_range: Option<PriceRange>,
}

impl CatalogQuery {
    /// Whether `entry` passes every filter.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.category.matches(&entry.category)
            && self.difficulty.matches(&entry.difficulty)
            && self
                .price_range
                .map_or(true, |range| range.contains(entry.price.standard))
            && matches_search_text(&self.search_text, entry)
    }
}

fn matches_search_text(search_text: &str, entry: &CatalogEntry) -> bool {
    let needle = search_text.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    entry.title.to_lowercase().contains(&needle)
        || entry.composer.to_lowercase().contains(&needle)
        || entry.description.to_lowercase().contains(&needle)
        || entry.tags.iter().any(|tag| tag.to_lowercase() == needle)
}
