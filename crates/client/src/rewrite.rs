//! Insert statement rewrite
//!
//! Inserts always ship their rows as native blocks, so any literal
//! `VALUES (...)` list in the statement is cut off and the statement is
//! made to end in `VALUES`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Start of an inline values list: whitespace, `VALUES`, optional whitespace, `(`
static VALUES_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\sVALUES\s*\(").expect("values pattern is valid"));

/// Rewrite an INSERT statement for block-mode insertion
///
/// ```
/// use chwire_client::insert_query;
///
/// assert_eq!(insert_query("INSERT INTO t (a, b)"), "INSERT INTO t (a, b) VALUES");
/// assert_eq!(insert_query("insert into t values (1, 2)"), "insert into t VALUES");
/// assert_eq!(insert_query("INSERT INTO t VALUES"), "INSERT INTO t VALUES");
/// assert_eq!(insert_query("INSERT INTO my_values"), "INSERT INTO my_values VALUES");
/// ```
pub fn insert_query(query: &str) -> String {
    let head = match VALUES_LIST.find(query) {
        Some(m) => &query[..m.start()],
        None => query,
    };
    let head = head.trim();
    if ends_with_values_keyword(head) {
        return head.to_string();
    }
    format!("{head} VALUES")
}

/// `VALUES` as a whole trailing word, so `my_values` does not count
fn ends_with_values_keyword(head: &str) -> bool {
    const KEYWORD: &str = "VALUES";
    let Some(split) = head.len().checked_sub(KEYWORD.len()) else {
        return false;
    };
    if !head.is_char_boundary(split) || !head[split..].eq_ignore_ascii_case(KEYWORD) {
        return false;
    }
    head[..split]
        .chars()
        .next_back()
        .is_none_or(char::is_whitespace)
}

#[cfg(test)]
#[path = "rewrite_test.rs"]
mod rewrite_test;
