//! Key normalization for cache-space ids and entry keys.
//!
//! Cache identifiers arrive as free-form strings (often rendered from query
//! statements or parameter lists), so logically equal identifiers can differ
//! in incidental spacing. Normalizing both the cache-space id and every entry
//! key keeps the on-wire key space stable: `"user, profile"` and
//! `"user,  profile"` address the same remote container.

use regex::Regex;
use std::sync::LazyLock;

static BLANK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("blank regex is valid"));

/// Canonicalize an identifier for use as a remote-store key.
///
/// Collapses every run of two or more whitespace characters to a single
/// space, then collapses `", "` to `","` so comma-separated lists render
/// identically regardless of original spacing.
///
/// Does **not** trim, lowercase, or escape delimiter characters - callers
/// must not assume collision-freedom across inputs differing only in case
/// or in single-space structure.
///
/// Deterministic and idempotent: `normalize(normalize(s)) == normalize(s)`.
///
/// # Example
///
/// ```rust
/// use redis_query_cache::key::normalize;
///
/// assert_eq!(normalize("select  *   from t"), "select * from t");
/// assert_eq!(normalize("user,  profile"), "user,profile");
/// assert_eq!(normalize("user, profile"), "user,profile");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    // <multi space> replace to <one space>
    // <, >          replace to <,>
    let collapsed = BLANK_PATTERN.replace_all(raw, " ");
    collapsed.replace(", ", ",")
}
