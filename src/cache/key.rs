//! Cache key construction.

use std::fmt::Display;

use url::form_urlencoded;

/// Builds `prefix:name=value&...` with parameters sorted by name.
///
/// Semantically identical requests map to the same key regardless of the
/// order their parameters were supplied in. Names and values are
/// form-urlencoded so `&` and `=` inside values cannot fake extra pairs.
pub fn create_cache_key<I, K, V>(prefix: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Display,
{
    let mut pairs: Vec<(String, String)> = params
        .into_iter()
        .map(|(name, value)| (name.as_ref().to_string(), value.to_string()))
        .collect();
    pairs.sort();

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();

    format!("{prefix}:{query}")
}
