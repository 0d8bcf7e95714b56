use std::collections::HashMap;

/// Name set with case-insensitive membership that remembers the original
/// spelling of each name.
#[derive(Debug, Clone, Default)]
pub struct CaseInsensitiveSet {
    map: HashMap<String, String>,
}

impl CaseInsensitiveSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = HashMap::new();
        for name in names {
            let name = name.as_ref();
            map.entry(name.to_ascii_lowercase())
                .or_insert_with(|| name.to_string());
        }
        Self { map }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(&name.to_ascii_lowercase())
    }

    /// Names from `required` that are not in the set, in the given order.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| !self.contains(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let set = CaseInsensitiveSet::new(["PTID", "AdcId", "naccid"]);
        assert!(set.contains("ptid"));
        assert!(set.contains("ADCID"));
        assert_eq!(set.get("adcid"), Some("AdcId"));
        assert!(!set.contains("guid"));
    }

    #[test]
    fn missing_keeps_required_order() {
        let set = CaseInsensitiveSet::new(["ptid"]);
        assert_eq!(set.missing(&["naccid", "ptid", "adcid"]), vec!["naccid", "adcid"]);
    }
}
