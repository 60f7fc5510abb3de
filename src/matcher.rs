use crate::{
    normalize::{self, NameCleaner},
    text_util::collapse_words,
};

/// Split a query into lowercase words.
pub fn query_words(query: &str) -> Vec<String> {
    collapse_words(query)
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve `query` to the folders whose cleaned name contains every query
/// word as a substring.
///
/// Substring rather than whole-word matching is deliberate: partial
/// surnames still find their folder. The result keeps the order of
/// `folders`; an empty query matches nothing.
///
/// # Examples
///
/// ```
/// use dossier::{matcher::match_folders, normalize::NameCleaner};
///
/// let folders = vec![
///     "Base/Group/Ivanov_Petr_01.01".to_string(),
///     "Base/Group/Ivanov_Ivan_02.02".to_string(),
/// ];
/// let found = match_folders("ivanov petr", &folders, &NameCleaner::default());
/// assert_eq!(found, vec!["Base/Group/Ivanov_Petr_01.01".to_string()]);
/// ```
pub fn match_folders(
    query: &str,
    folders: &[String],
    cleaner: &NameCleaner,
) -> Vec<String> {
    let words = query_words(query);
    if words.is_empty() {
        return Vec::new();
    }

    folders
        .iter()
        .filter(|folder| {
            let name = cleaner.comparable(normalize::basename(folder));
            words.iter().all(|word| name.contains(word.as_str()))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn folders() -> Vec<String> {
        vec![
            "Base/Group/Ivanov_Petr_01.01".to_string(),
            "Base/Group/Ivanov_Ivan_02.02".to_string(),
            "Base/Group/Sherlock_Petrova_Anna_03.03".to_string(),
        ]
    }

    fn cleaner() -> NameCleaner {
        NameCleaner::new(Some("Sherlock")).unwrap()
    }

    #[test]
    fn full_name_selects_one_folder() {
        let found = match_folders("ivanov petr", &folders()[..2], &cleaner());
        assert_eq!(found, vec!["Base/Group/Ivanov_Petr_01.01"]);
    }

    #[test]
    fn partial_word_matches_as_substring() {
        let found = match_folders("petr", &folders(), &cleaner());
        assert_eq!(
            found,
            vec![
                "Base/Group/Ivanov_Petr_01.01",
                "Base/Group/Sherlock_Petrova_Anna_03.03",
            ]
        );
    }

    #[test]
    fn query_is_case_and_separator_insensitive() {
        let found = match_folders("  IVANOV__ivan ", &folders(), &cleaner());
        assert_eq!(found, vec!["Base/Group/Ivanov_Ivan_02.02"]);
    }

    #[test]
    fn date_query_matches() {
        let found = match_folders("03.03", &folders(), &cleaner());
        assert_eq!(found, vec!["Base/Group/Sherlock_Petrova_Anna_03.03"]);
    }

    #[test]
    fn noise_prefix_is_not_searchable() {
        assert!(match_folders("sherlock", &folders(), &cleaner()).is_empty());
    }

    #[test]
    fn empty_and_blank_queries_match_nothing() {
        assert!(match_folders("", &folders(), &cleaner()).is_empty());
        assert!(match_folders("   ", &folders(), &cleaner()).is_empty());
        assert!(match_folders("__", &folders(), &cleaner()).is_empty());
    }

    proptest! {
        #[test]
        fn matches_are_exactly_the_folders_containing_all_words(
            names in proptest::collection::vec("[a-c_]{1,8}", 0..12),
            query in "[a-c ]{0,6}",
        ) {
            let folders: Vec<String> =
                names.iter().map(|n| format!("Base/G/{n}")).collect();
            let cleaner = NameCleaner::default();
            let words = query_words(&query);
            let found = match_folders(&query, &folders, &cleaner);

            for folder in &folders {
                let name = cleaner.comparable(normalize::basename(folder));
                let expected = !words.is_empty()
                    && words.iter().all(|w| name.contains(w.as_str()));
                prop_assert_eq!(found.contains(folder), expected);
            }

            let positions: Vec<usize> = found
                .iter()
                .map(|f| folders.iter().position(|g| g == f).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
