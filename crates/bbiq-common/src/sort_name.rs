//! Sortable name derivation for aliases.
//!
//! Collective names move a leading article to the end
//! (`The Collection of Stories` -> `Collection of Stories, The`); anything else
//! is treated as a personal name and rearranged to `Last Suffix, Given Names`.

const ARTICLES: &[&str] = &["a", "an", "the", "los", "las", "el", "la"];

const SUFFIXES: &[&str] = &[
    "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii", "xiii", "xiv", "xv",
    "jr", "junior", "sr", "senior", "phd", "md", "dmd", "dds", "esq",
];

fn strip_dots(word: &str) -> String {
    word.replace('.', "")
}

fn is_suffix(word: &str) -> bool {
    SUFFIXES.contains(&strip_dots(word).to_lowercase().as_str())
}

/// Derive the sort name for `name`.
///
/// Returns an empty string for blank input and the trimmed name itself for
/// single words.
pub fn sort_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let without_commas = trimmed.replace(',', "");
    let mut words: Vec<&str> = without_commas.split(' ').collect();
    if words.len() == 1 {
        return trimmed.to_string();
    }

    let first = strip_dots(words[0]);
    if ARTICLES.contains(&first.to_lowercase().as_str()) {
        return format!("{}, {}", words[1..].join(" "), first);
    }

    // Trailing run of suffixes stays attached to the last name
    let suffix_start = words
        .iter()
        .rposition(|word| !is_suffix(word))
        .map_or(0, |index| index + 1);
    if suffix_start == 0 {
        return trimmed.to_string();
    }
    let suffixes = words.split_off(suffix_start);

    let mut last_name = words.pop().unwrap_or_default().to_string();
    if !suffixes.is_empty() {
        last_name.push(' ');
        last_name.push_str(&suffixes.join(" "));
    }

    format!("{}, {}", last_name, words.join(" "))
}
