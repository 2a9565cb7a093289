//! Server side of the list view: how the filter query string is read back.
//!
//! Any omitted or unparsable parameter means "no filter" (or page 1).

use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use url::form_urlencoded;

use crate::filter::FilterField;
use crate::store::Post;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub visible: Option<bool>,
    pub index: Option<bool>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub provide: Option<String>,
    pub page: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            visible: None,
            index: None,
            tag: None,
            search: None,
            provide: None,
            page: 1,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    value.trim().parse::<i64>().ok().map(|n| n != 0)
}

impl ListQuery {
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut parsed = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let Some(field) = FilterField::from_id(&key) else {
                continue;
            };
            match field {
                FilterField::Visible => parsed.visible = parse_flag(&value),
                FilterField::Index => parsed.index = parse_flag(&value),
                FilterField::Tag => parsed.tag = Some(value.into_owned()),
                FilterField::Search => parsed.search = Some(value.into_owned()),
                FilterField::Provide => parsed.provide = Some(value.into_owned()),
                FilterField::Page => {
                    let page = value.trim().parse::<i64>().unwrap_or(1);
                    parsed.page = clamp_page(page, usize::MAX);
                }
            }
        }
        parsed
    }

    pub fn matches(&self, post: &Post) -> bool {
        if let Some(tag) = self.tag.as_deref().filter(|t| !t.is_empty()) {
            if !post.tags.contains(tag) {
                return false;
            }
        }
        if self.index.is_some_and(|index| post.indexed != index) {
            return false;
        }
        if self.visible.is_some_and(|visible| post.public != visible) {
            return false;
        }
        if self.provide.as_deref().is_some_and(|p| post.provide != p) {
            return false;
        }
        if let Some(search) = self.search.as_deref() {
            if !like_words(search, &post.slug) && !like_words(search, &post.title) {
                return false;
            }
        }
        true
    }
}

/// Whitespace-separated words must all occur, in order, ignoring ASCII case.
fn like_words(search: &str, haystack: &str) -> bool {
    let haystack = haystack.to_ascii_lowercase();
    let mut rest = haystack.as_str();
    for word in search.split_whitespace() {
        let word = word.to_ascii_lowercase();
        match rest.find(&word) {
            Some(pos) => rest = &rest[pos + word.len()..],
            None => return false,
        }
    }
    true
}

/// Clamp a requested page into `1..=max`, never below 1.
pub fn clamp_page(page: i64, max: usize) -> usize {
    let max = i64::try_from(max).unwrap_or(i64::MAX);
    page.min(max).max(1) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub max_page: usize,
    pub prev: usize,
    pub next: usize,
}

impl Pagination {
    pub fn new(page: usize, max_page: usize) -> Self {
        let last = max_page.max(1);
        Self {
            page,
            max_page,
            prev: page.saturating_sub(1).clamp(1, last),
            next: page.saturating_add(1).clamp(1, last),
        }
    }
}

/// `YYYY/MM/DD HH:MM` in UTC.
pub fn format_timestamp(timestamp: i64) -> String {
    let format = format_description!("[year]/[month]/[day] [hour]:[minute]");
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|dt| dt.format(&format).ok())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Inverse of [`format_timestamp`].
pub fn parse_timestamp(input: &str) -> Option<i64> {
    let format = format_description!("[year]/[month]/[day] [hour]:[minute]");
    PrimitiveDateTime::parse(input.trim(), &format)
        .ok()
        .map(|dt| dt.assume_utc().unix_timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(slug: &str, title: &str) -> Post {
        let mut post = Post::new(slug).unwrap();
        post.title = title.to_string();
        post
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(ListQuery::parse(""), ListQuery::default());
        let q = ListQuery::parse("?visible=abc&index=0&page=-3");
        assert_eq!(q.visible, None);
        assert_eq!(q.index, Some(false));
        assert_eq!(q.page, 1);
    }

    #[test]
    fn test_parse_values() {
        let q = ListQuery::parse("visible=1&tag=rust&search=hello+world&provide=main&page=7");
        assert_eq!(q.visible, Some(true));
        assert_eq!(q.tag.as_deref(), Some("rust"));
        assert_eq!(q.search.as_deref(), Some("hello world"));
        assert_eq!(q.provide.as_deref(), Some("main"));
        assert_eq!(q.page, 7);
    }

    #[test]
    fn test_search_words_in_order() {
        let q = ListQuery::parse("search=hello+rust");
        assert!(q.matches(&post("a", "Hello, brave Rust")));
        assert!(!q.matches(&post("b", "Rust says hello")));
        assert!(q.matches(&post("hello-rust", "")));
    }

    #[test]
    fn test_flag_filters() {
        let mut p = post("a", "");
        p.public = true;
        assert!(ListQuery::parse("visible=1").matches(&p));
        assert!(!ListQuery::parse("visible=0").matches(&p));
        assert!(ListQuery::parse("index=0").matches(&p));
        assert!(!ListQuery::parse("tag=x").matches(&p));
        p.tags.insert("x".into());
        assert!(ListQuery::parse("tag=x").matches(&p));
    }

    #[test]
    fn test_pagination_bounds() {
        assert_eq!(Pagination::new(1, 3).prev, 1);
        assert_eq!(Pagination::new(1, 3).next, 2);
        assert_eq!(Pagination::new(3, 3).next, 3);
        assert_eq!(Pagination::new(1, 0).next, 1);
    }

    #[test]
    fn test_pagination_huge_page_does_not_overflow() {
        let query = ListQuery::parse("page=9223372036854775807");
        let pagination = Pagination::new(query.page, 2);
        assert_eq!(pagination.prev, 2);
        assert_eq!(pagination.next, 2);

        let pagination = Pagination::new(usize::MAX, 5);
        assert_eq!((pagination.prev, pagination.next), (5, 5));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970/01/01 00:00");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1970/01/02 00:00"), Some(86_400));
        assert_eq!(parse_timestamp(" 2024/02/29 13:45 "), Some(1_709_214_300));
        assert_eq!(parse_timestamp(&format_timestamp(1_709_214_300)), Some(1_709_214_300));
        assert_eq!(parse_timestamp("2024-02-29 13:45"), None);
        assert_eq!(parse_timestamp("2023/02/29 13:45"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
