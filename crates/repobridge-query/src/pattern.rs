//! Compiled regex patterns, shared process-wide.
//!
//! Regex matchers in query-by-example are validated before a query is built,
//! and the same few patterns tend to be used over and over, so compiled
//! patterns are cached by (pattern, case flag).

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

struct RegexCache {
    cache: RwLock<HashMap<(String, bool), Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str, case_insensitive: bool) -> Result<Regex, regex::Error> {
        let key = (pattern.to_string(), case_insensitive);
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = cache.get(&key) {
                return Ok(regex.clone());
            }
        }

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(cache.entry(key).or_insert(regex).clone())
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Compile `pattern`, or return the compiler's message.
pub fn compile(pattern: &str, case_insensitive: bool) -> Result<Regex, String> {
    regex_cache()
        .get_or_compile(pattern, case_insensitive)
        .map_err(|e| e.to_string())
}

/// Check if `value` matches `pattern`.
///
/// An invalid pattern is logged and treated as a non-match. Stores that
/// evaluate `Expr::Regex` in process can use this directly.
pub fn matches_pattern(value: &str, pattern: &str, case_insensitive: bool) -> bool {
    match regex_cache().get_or_compile(pattern, case_insensitive) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid regex pattern, treating as non-match"
            );
            false
        }
    }
}

/// Match `value` against a LIKE pattern (`%` any run, `_` one character,
/// `\` escapes the next character).
pub fn matches_like(value: &str, pattern: &str, case_insensitive: bool) -> bool {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    regex.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    matches_pattern(value, &regex, case_insensitive)
}

/// Escape LIKE wildcards in literal text.
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
