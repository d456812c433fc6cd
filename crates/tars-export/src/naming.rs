//! File naming conventions shared by metadata lookup and pruning

/// Pick the member with the greatest key.
///
/// Names rejected by `key` (returning `None`) are not family members and are
/// ignored. Equal keys are resolved by plain string order of the names, so the
/// result does not depend on listing order.
pub fn select_newest<'a, I, K, F>(names: I, mut key: F) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
    K: Ord,
    F: FnMut(&str) -> Option<K>,
{
    names
        .into_iter()
        .filter_map(|name| key(name).map(|k| (k, name.as_str())))
        .max()
        .map(|(_, name)| name)
}

/// Numeric key of a sequenced metadata name: the digits before the first `-`.
///
/// `"1000001-TARS.json"` has key `1000001`; names with an empty or non-numeric
/// prefix have none.
pub fn sequence_key(name: &str) -> Option<u64> {
    let (prefix, _) = name.split_once('-')?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

/// Case-insensitive ASCII prefix test
pub fn has_prefix_ignore_case(name: &str, prefix: &str) -> bool {
    name.len() >= prefix.len()
        && name.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Ordering key for processed result files: dashes removed, lowercased
pub fn dashless_lowercase(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sequence_key() {
        assert_eq!(sequence_key("1000001-TARS.json"), Some(1000001));
        assert_eq!(sequence_key("7-a-b"), Some(7));
        assert_eq!(sequence_key("dva-metadata.json"), None);
        assert_eq!(sequence_key("-TARS.json"), None);
        assert_eq!(sequence_key("12TARS.json"), None);
        assert_eq!(sequence_key("+5-TARS.json"), None);
    }

    #[test]
    fn test_select_newest_is_numeric() {
        let listing = names(&["999-TARS.json", "1000-TARS.json", "5-TARS.json"]);
        assert_eq!(select_newest(&listing, sequence_key), Some("1000-TARS.json"));
    }

    #[test]
    fn test_select_newest_ignores_non_members() {
        let listing = names(&["dva.json", "notes.txt"]);
        assert_eq!(select_newest(&listing, sequence_key), None);
        assert_eq!(select_newest(&Vec::<String>::new(), sequence_key), None);
    }

    #[test]
    fn test_select_newest_ties_use_name_order() {
        let forward = names(&["05-TARS.json", "5-TARS.json"]);
        let backward = names(&["5-TARS.json", "05-TARS.json"]);
        assert_eq!(select_newest(&forward, sequence_key), Some("5-TARS.json"));
        assert_eq!(select_newest(&backward, sequence_key), Some("5-TARS.json"));
    }

    #[test]
    fn test_has_prefix_ignore_case() {
        assert!(has_prefix_ignore_case("Processed-X.xml", "processed-"));
        assert!(has_prefix_ignore_case("processed-X.xml", "PROCESSED-"));
        assert!(!has_prefix_ignore_case("X.xml", "processed-"));
        assert!(!has_prefix_ignore_case("proc", "processed-"));
    }

    #[test]
    fn test_dashless_lowercase() {
        assert_eq!(dashless_lowercase("Processed-TARS-2.xml"), "processedtars2.xml");
    }
}
