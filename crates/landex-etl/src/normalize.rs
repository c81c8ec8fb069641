//! Source column-name normalization
//!
//! Tabular sources name their columns however they like (`customerKey`,
//! `Store-ID`, `Store Name`). The landing tables use lowercase
//! snake_case, so every incoming column name is rewritten into that
//! canonical form before it is reconciled against the destination
//! schema.

use regex::Regex;
use std::sync::LazyLock;

static UNDERSCORE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("valid regex"));

// First pass splits before an uppercase letter that starts a lowercase
// run; second pass splits between a lowercase/digit and an uppercase
// letter. Consecutive uppercase letters ("StoreID") stay together.
static CAMEL_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));
static CAMEL_SECOND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// Convert camelCase or PascalCase to snake_case.
///
/// `customerKey` -> `customer_key`, `StoreID` -> `store_id`
pub fn camel_to_snake(name: &str) -> String {
    let s1 = CAMEL_FIRST.replace_all(name, "${1}_${2}");
    CAMEL_SECOND
        .replace_all(&s1, "${1}_${2}")
        .to_lowercase()
}

/// Normalize an arbitrary source column name to its canonical form.
///
/// Spaces are deleted, hyphens become underscores, camel boundaries are
/// converted and the whole name lowercased, then underscore runs
/// collapse to one. The collapse comes last: the camel passes insert
/// underscores next to existing ones (`Line__Item` -> `Line___Item`),
/// so collapsing earlier would leave runs in the output and break
/// idempotence. Pure: no state, same input always yields the same
/// output.
pub fn normalize_column(name: &str) -> String {
    let col = name.replace(' ', "").replace('-', "_");
    let col = camel_to_snake(&col);
    UNDERSCORE_RUNS.replace_all(&col, "_").into_owned()
}
