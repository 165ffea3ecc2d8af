//! Search query extraction from visited URLs

use std::collections::HashMap;
use url::Url;

use crate::models::SearchQueryStat;

/// Engines whose result pages carry the query in a `q` parameter, with the
/// path prefix identifying a results page.
const SEARCH_ENGINES: &[(&str, &str)] = &[
    ("google.com", "/search"),
    ("bing.com", "/search"),
    ("duckduckgo.com", "/"),
];

/// Queries this short are mostly autocomplete noise.
const MIN_QUERY_CHARS: usize = 3;

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Decoded search terms if `raw` is a search-engine results URL.
pub fn extract_search_query(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();

    let is_results_page = SEARCH_ENGINES
        .iter()
        .any(|(domain, path)| host_matches(&host, domain) && parsed.path().starts_with(path));
    if !is_results_page {
        return None;
    }

    let query = parsed
        .query_pairs()
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value.trim().to_string())?;

    (query.chars().count() >= MIN_QUERY_CHARS).then_some(query)
}

/// Count search queries across `urls`, most frequent first, ties by query.
pub fn count_search_queries<'a, I>(urls: I, limit: usize) -> Vec<SearchQueryStat>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    for url in urls {
        if let Some(query) = extract_search_query(url) {
            *counts.entry(query).or_insert(0) += 1;
        }
    }

    let mut stats: Vec<SearchQueryStat> = counts
        .into_iter()
        .map(|(query, count)| SearchQueryStat { query, count })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
    stats.truncate(limit);
    stats
}
