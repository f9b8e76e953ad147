mod criteria;
mod query;

pub use criteria::{CatalogQuery, PriceRange, Selection, SortKey};
pub use query::{count_by_category, query};
