use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category attached to every visit record.
///
/// The variant order is the evaluation order of [`CATEGORY_RULES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Social,
    Development,
    Documentation,
    Search,
    News,
    Shopping,
    Entertainment,
    Email,
    Other,
}

/// Bumped whenever a keyword is added, removed or the rule order changes.
pub const CATEGORY_TABLE_VERSION: u32 = 1;

/// Ordered keyword table. The first rule with a matching keyword wins, so a
/// URL hitting both a social and a development keyword is `Social`.
pub const CATEGORY_RULES: &[(Category, &[&str])] = &[
    (
        Category::Social,
        &["facebook.com", "twitter.com", "instagram.com", "reddit.com", "tiktok.com"],
    ),
    (
        Category::Development,
        &["github.com", "stackoverflow.com", "gitlab.com", "bitbucket.org"],
    ),
    (
        Category::Documentation,
        &["docs.", "documentation", "readme", "api."],
    ),
    (
        Category::Search,
        &["google.com/search", "bing.com/search", "duckduckgo.com"],
    ),
    (Category::News, &["news.", "bbc.com", "cnn.com", "reuters.com"]),
    (
        Category::Shopping,
        &["amazon.com", "ebay.com", "shop.", "store."],
    ),
    (
        Category::Entertainment,
        &["youtube.com", "netflix.com", "spotify.com", "twitch.tv"],
    ),
    (
        Category::Email,
        &["gmail.com", "outlook.com", "yahoo.com/mail"],
    ),
];

/// Classify a visit. Total: anything unmatched is `Other`.
///
/// Table version 1 only looks at the URL; the title is part of the contract
/// so later table versions can use it without touching callers.
pub fn categorize(url: &str, _title: Option<&str>) -> Category {
    let url = url.to_lowercase();

    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| url.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Social => "social",
            Category::Development => "development",
            Category::Documentation => "documentation",
            Category::Search => "search",
            Category::News => "news",
            Category::Shopping => "shopping",
            Category::Entertainment => "entertainment",
            Category::Email => "email",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    /// Stored labels from older table versions map to `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "social" => Category::Social,
            "development" => Category::Development,
            "documentation" => Category::Documentation,
            "search" => Category::Search,
            "news" => Category::News,
            "shopping" => Category::Shopping,
            "entertainment" => Category::Entertainment,
            "email" => Category::Email,
            _ => Category::Other,
        })
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or(Category::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order_social_before_development() {
        // reddit.com is social, github.com is development
        let url = "https://www.reddit.com/r/rust/comments/x?ref=github.com";
        assert_eq!(categorize(url, None), Category::Social);
    }

    #[test]
    fn test_documentation_before_search() {
        let url = "https://www.google.com/search?q=docs.rs+serde";
        assert_eq!(categorize(url, None), Category::Documentation);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            categorize("HTTPS://GITHUB.COM/tokio-rs/axum", Some("axum")),
            Category::Development
        );
    }

    #[test]
    fn test_default_is_other() {
        assert_eq!(categorize("https://example.org/", None), Category::Other);
        assert_eq!(categorize("", None), Category::Other);
        assert_eq!(categorize("not a url at all", Some("title")), Category::Other);
    }

    #[test]
    fn test_each_rule_reachable() {
        let cases = [
            ("https://twitter.com/home", Category::Social),
            ("https://gitlab.com/x", Category::Development),
            ("https://docs.rs/tokio", Category::Documentation),
            ("https://duckduckgo.com/?q=x", Category::Search),
            ("https://www.bbc.com/sport", Category::News),
            ("https://www.ebay.com/itm/1", Category::Shopping),
            ("https://www.twitch.tv/", Category::Entertainment),
            ("https://mail.gmail.com/", Category::Email),
        ];
        for (url, expected) in cases {
            assert_eq!(categorize(url, None), expected, "{url}");
        }
    }

    #[test]
    fn test_deterministic() {
        let url = "https://news.ycombinator.com/item?id=1";
        let first = categorize(url, None);
        for _ in 0..10 {
            assert_eq!(categorize(url, None), first);
        }
    }

    #[test]
    fn test_label_round_trip_and_unknown() {
        for (category, _) in CATEGORY_RULES {
            assert_eq!(Category::from(category.as_str()), *category);
        }
        assert_eq!(Category::from("gaming"), Category::Other);
        assert_eq!(
            serde_json::to_string(&Category::Documentation).unwrap(),
            "\"documentation\""
        );
    }
}
