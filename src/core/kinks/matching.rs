// Fuzzy name matching for catalogue lookups.
//
// Kink names come in via chat, typos and all, so lookups pick the
// catalogue entry with the smallest edit distance to the query.

/// Levenshtein distance between two strings, case-insensitive.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Picks the item whose name (per `name_of`) is closest to `query`.
/// Returns None for an empty collection.
pub fn best_match_by<'a, T, F>(items: &'a [T], query: &str, name_of: F) -> Option<&'a T>
where
    F: Fn(&T) -> &str,
{
    items
        .iter()
        .min_by_key(|item| edit_distance(name_of(item), query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("flaw", "lawn"), 2);
    }

    #[test]
    fn distance_is_case_insensitive() {
        assert_eq!(edit_distance("Bondage", "bondage"), 0);
    }

    #[test]
    fn best_match_tolerates_typos() {
        let names = vec!["bondage", "petplay", "vore"];
        let best = best_match_by(&names, "bondoge", |n| n).unwrap();
        assert_eq!(*best, "bondage");
    }

    #[test]
    fn best_match_of_empty_is_none() {
        let names: Vec<&str> = vec![];
        assert!(best_match_by(&names, "anything", |n| n).is_none());
    }
}
