//! Entity name helpers.

/// Returns the English plural of an entity name, as used in endpoint paths.
///
/// # Examples
///
/// ```
/// use repokit_core::naming::pluralize;
///
/// assert_eq!(pluralize("user"), "users");
/// assert_eq!(pluralize("analysis"), "analyses");
/// assert_eq!(pluralize("category"), "categories");
/// ```
pub fn pluralize(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let lower = name.to_ascii_lowercase();

    if let Some(stem) = lower.strip_suffix("sis").map(|_| &name[..name.len() - 2]) {
        return format!("{stem}es");
    }
    if lower.ends_with('y') && !ends_with_vowel_y(&lower) {
        return format!("{}ies", &name[..name.len() - 1]);
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{name}es");
    }
    format!("{name}s")
}

fn ends_with_vowel_y(lower: &str) -> bool {
    let mut chars = lower.chars().rev();
    chars.next();
    matches!(chars.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_nouns() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("project"), "projects");
        assert_eq!(pluralize("table"), "tables");
        assert_eq!(pluralize("column"), "columns");
        assert_eq!(pluralize("result"), "results");
    }

    #[test]
    fn test_sibilant_endings() {
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("batch"), "batches");
        assert_eq!(pluralize("status"), "statuses");
    }

    #[test]
    fn test_y_endings() {
        assert_eq!(pluralize("entry"), "entries");
        assert_eq!(pluralize("key"), "keys");
    }

    #[test]
    fn test_sis_endings() {
        assert_eq!(pluralize("analysis"), "analyses");
    }

    #[test]
    fn test_empty() {
        assert_eq!(pluralize(""), "");
    }
}
