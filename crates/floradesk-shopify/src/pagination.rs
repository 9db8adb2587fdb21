//! Cursor pagination carried in the Admin API `Link` response header.
//!
//! A page that has a successor answers with
//!
//! ```text
//! <https://shop.myshopify.com/admin/api/2024-01/orders.json?limit=250&page_info=abc>; rel="next"
//! ```
//!
//! and middle pages list a `rel="previous"` entry alongside it. The last page
//! omits the `next` entry (or the header altogether).

/// Returns the `page_info` cursor of the `rel="next"` entry, if any.
#[must_use]
pub fn next_page_info(link_header: Option<&str>) -> Option<String> {
    link_header?
        .split(',')
        .map(str::trim)
        .find(|entry| is_next_relation(entry))
        .and_then(link_target)
        .and_then(|target| reqwest::Url::parse(target).ok())
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "page_info")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|cursor| !cursor.is_empty())
}

fn is_next_relation(entry: &str) -> bool {
    entry
        .split(';')
        .skip(1)
        .map(str::trim)
        .any(|param| param.eq_ignore_ascii_case(r#"rel="next""#) || param == "rel=next")
}

fn link_target(entry: &str) -> Option<&str> {
    let open = entry.find('<')?;
    let close = entry[open..].find('>')? + open;
    Some(&entry[open + 1..close])
}
