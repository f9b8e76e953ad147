use super::criteria::{CatalogQuery, SortKey};
use crate::catalog_store::{CatalogEntry, Category};

/// Filters and sorts `entries` into a new collection. Never touches the
/// input; entries that compare equal keep their input order.
pub fn query(entries: &[CatalogEntry], criteria: &CatalogQuery) -> Vec<CatalogEntry> {
    let mut results: Vec<CatalogEntry> = entries
        .iter()
        .filter(|entry| criteria.matches(entry))
        .cloned()
        .collect();

    match criteria.sort {
        SortKey::Title => results.sort_by_cached_key(|entry| entry.title.to_lowercase()),
        SortKey::Composer => results.sort_by_cached_key(|entry| entry.composer.to_lowercase()),
        SortKey::Difficulty => results.sort_by_key(|entry| entry.difficulty.rank()),
        SortKey::Price => results.sort_by_key(|entry| entry.price.standard),
        SortKey::Newest => results.sort_by(|a, b| b.year_composed.cmp(&a.year_composed)),
        SortKey::Unsorted => {}
    }

    results
}

/// Number of entries per category, in enumeration order. Categories with no
/// entries are reported as zero.
pub fn count_by_category(entries: &[CatalogEntry]) -> Vec<(Category, usize)> {
    Category::ALL
        .iter()
        .map(|category| {
            let count = entries.iter().filter(|e| e.category == *category).count();
            (*category, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::{Difficulty, Price};
    use crate::search::{PriceRange, Selection};
    use chrono::{TimeZone, Utc};

    fn make_entry(
        id: &str,
        title: &str,
        category: Category,
        difficulty: Difficulty,
        price: u32,
    ) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            title: title.to_string(),
            composer: "Anon".to_string(),
            category,
            subcategory: None,
            difficulty,
            duration: "3:00".to_string(),
            description: "An arrangement".to_string(),
            instrumentation: vec![],
            tempo: None,
            key_signature: None,
            year_composed: 2020,
            tags: vec![],
            price: Price {
                standard: price,
                exclusive: price * 10,
            },
            files: None,
            upload_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn ids(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    fn sample() -> Vec<CatalogEntry> {
        vec![
            make_entry("thunder", "Thunder Strike", Category::Drumline, Difficulty::Advanced, 80),
            make_entry("waltz", "Calm Waltz", Category::FullBand, Difficulty::Beginner, 20),
        ]
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let criteria = CatalogQuery {
            search_text: "anything".to_string(),
            category: Selection::Only(Category::Beats),
            sort: SortKey::Price,
            ..Default::default()
        };
        assert!(query(&[], &criteria).is_empty());
        assert!(query(&[], &CatalogQuery::default()).is_empty());
    }

    #[test]
    fn test_category_filter_combination() {
        let criteria = CatalogQuery {
            category: Selection::Only(Category::Drumline),
            difficulty: Selection::All,
            sort: SortKey::Title,
            ..Default::default()
        };
        assert_eq!(ids(&query(&sample(), &criteria)), vec!["thunder"]);
    }

    #[test]
    fn test_filters_are_anded() {
        let criteria = CatalogQuery {
            category: Selection::Only(Category::Drumline),
            difficulty: Selection::Only(Difficulty::Beginner),
            ..Default::default()
        };
        assert!(query(&sample(), &criteria).is_empty());
    }

    #[test]
    fn test_search_text_matches_fields_case_insensitively() {
        let mut entries = sample();
        entries[1].composer = "Jane Doe".to_string();
        entries[0].description = "Loud and FAST".to_string();

        let by = |text: &str| {
            let criteria = CatalogQuery {
                search_text: text.to_string(),
                sort: SortKey::Unsorted,
                ..Default::default()
            };
            ids(&query(&entries, &criteria))
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        assert_eq!(by("  strike "), vec!["thunder"]);
        assert_eq!(by("JANE"), vec!["waltz"]);
        assert_eq!(by("fast"), vec!["thunder"]);
        assert_eq!(by(""), vec!["thunder", "waltz"]);
        assert!(by("nothing like this").is_empty());
    }

    #[test]
    fn test_search_text_matches_whole_tags_only() {
        let mut entries = sample();
        entries[0].tags = vec!["Marching".to_string()];

        let whole = CatalogQuery {
            search_text: "marching".to_string(),
            ..Default::default()
        };
        let partial = CatalogQuery {
            search_text: "march".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&query(&entries, &whole)), vec!["thunder"]);
        assert!(query(&entries, &partial).is_empty());
    }

    #[test]
    fn test_unrecognized_filter_matches_nothing() {
        let criteria = CatalogQuery {
            difficulty: Selection::parse("Expert"),
            ..Default::default()
        };
        assert!(query(&sample(), &criteria).is_empty());
    }

    #[test]
    fn test_price_sort_is_ascending() {
        let entries = vec![
            make_entry("a", "A", Category::Beats, Difficulty::Beginner, 80),
            make_entry("b", "B", Category::Beats, Difficulty::Beginner, 20),
            make_entry("c", "C", Category::Beats, Difficulty::Beginner, 50),
        ];
        let criteria = CatalogQuery {
            sort: SortKey::Price,
            ..Default::default()
        };
        let prices: Vec<u32> = query(&entries, &criteria)
            .iter()
            .map(|e| e.price.standard)
            .collect();
        assert_eq!(prices, vec![20, 50, 80]);
    }

    #[test]
    fn test_difficulty_sort_is_stable() {
        let entries = vec![
            make_entry("adv1", "Z", Category::Beats, Difficulty::Advanced, 1),
            make_entry("all", "Y", Category::Beats, Difficulty::AllLevels, 1),
            make_entry("beg", "X", Category::Beats, Difficulty::Beginner, 1),
            make_entry("adv2", "A", Category::Beats, Difficulty::Advanced, 1),
            make_entry("pro", "B", Category::Beats, Difficulty::Professional, 1),
        ];
        let criteria = CatalogQuery {
            sort: SortKey::Difficulty,
            ..Default::default()
        };
        assert_eq!(
            ids(&query(&entries, &criteria)),
            vec!["beg", "adv1", "adv2", "pro", "all"]
        );
    }

    #[test]
    fn test_title_sort_ignores_case() {
        let entries = vec![
            make_entry("b", "bravo", Category::Beats, Difficulty::Beginner, 1),
            make_entry("a", "Alpha", Category::Beats, Difficulty::Beginner, 1),
            make_entry("c", "Charlie", Category::Beats, Difficulty::Beginner, 1),
        ];
        assert_eq!(
            ids(&query(&entries, &CatalogQuery::default())),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_newest_sorts_by_year_descending() {
        let mut entries = sample();
        entries[0].year_composed = 1999;
        entries[1].year_composed = 2023;
        let criteria = CatalogQuery {
            sort: SortKey::Newest,
            ..Default::default()
        };
        assert_eq!(ids(&query(&entries, &criteria)), vec!["waltz", "thunder"]);
    }

    #[test]
    fn test_unsorted_preserves_input_order() {
        let criteria = CatalogQuery {
            sort: SortKey::parse("bogus"),
            ..Default::default()
        };
        assert_eq!(ids(&query(&sample(), &criteria)), vec!["thunder", "waltz"]);
    }

    #[test]
    fn test_price_range_filter() {
        let criteria = CatalogQuery {
            price_range: Some(PriceRange::UNDER_50),
            ..Default::default()
        };
        assert_eq!(ids(&query(&sample(), &criteria)), vec!["waltz"]);
    }

    #[test]
    fn test_query_is_idempotent_and_pure() {
        let entries = sample();
        let before = entries.clone();
        let criteria = CatalogQuery {
            sort: SortKey::Price,
            ..Default::default()
        };
        let first = query(&entries, &criteria);
        let second = query(&entries, &criteria);
        assert_eq!(first, second);
        assert_eq!(entries, before);
    }

    #[test]
    fn test_count_by_category() {
        let counts = count_by_category(&sample());
        assert_eq!(counts.len(), Category::ALL.len());
        assert_eq!(counts[0], (Category::Drumline, 1));
        assert_eq!(counts[1], (Category::FullBand, 1));
        assert!(counts[2..].iter().all(|(_, n)| *n == 0));
    }
}
