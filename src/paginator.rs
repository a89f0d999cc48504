use askama_actix::Template;
use sea_orm::{ConnectionTrait, DbErr, PaginatorTrait, SelectorTrait};
use serde::Deserialize;
use std::ops::RangeInclusive;

const PAGINATOR_LOOK_AHEAD: usize = 2;

/// `?page=` query string. Kept as a raw string so garbage falls back to page 1 instead of a 400.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// [1] 2 3 ... 13
/// 1 2 [3] 4 5 ... 13
/// 1 ... 4 5 [6] 7 8 ... 13
/// 1 ... 9 10 [11] 12 13
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paginator {
    pub base_url: String,
    /// 1-indexed.
    pub this_page: usize,
    pub page_count: usize,
    pub item_count: usize,
}

/// One page of items and the paginator describing where it sits.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub paginator: Paginator,
}

#[derive(Template)]
#[template(path = "util/paginator.html")]
struct PaginatorTemplate<'a> {
    paginator: &'a Paginator,
}

/// Number of pages for `item_count` items. An empty list still has one page.
pub fn page_count(item_count: usize, per_page: usize) -> usize {
    let per_page = per_page.max(1);
    ((item_count + per_page - 1) / per_page).max(1)
}

/// Resolves a requested page number against the page count.
/// Missing or non-numeric input yields page 1, anything out of range clamps to the nearest page.
pub fn clamp_page(requested: Option<&str>, page_count: usize) -> usize {
    let last = page_count.max(1);
    match requested.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(n)) if n < 1 => 1,
        Some(Ok(n)) if n as u64 > last as u64 => last,
        Some(Ok(n)) => n as usize,
        _ => 1,
    }
}

impl Paginator {
    pub fn new(base_url: &str, query: &PageQuery, item_count: usize, per_page: usize) -> Self {
        let page_count = page_count(item_count, per_page);
        Self {
            base_url: base_url.to_owned(),
            this_page: clamp_page(query.page.as_deref(), page_count),
            page_count,
            item_count,
        }
    }

    pub fn has_pages(&self) -> bool {
        self.page_count > 1
    }

    pub fn has_previous(&self) -> bool {
        self.this_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.this_page < self.page_count
    }

    pub fn url_for(&self, page: &usize) -> String {
        format!("{}?page={}", self.base_url, page)
    }

    /// Cursor window touches the first page.
    fn head_merged(&self) -> bool {
        self.this_page <= 2 * PAGINATOR_LOOK_AHEAD + 1
    }

    /// Cursor window touches the last page.
    fn tail_merged(&self) -> bool {
        self.this_page + 2 * PAGINATOR_LOOK_AHEAD >= self.page_count
    }

    /// Pages shown before the first ellipsis.
    pub fn get_first_pages(&self) -> RangeInclusive<usize> {
        if self.head_merged() {
            1..=(self.this_page + PAGINATOR_LOOK_AHEAD).min(self.page_count)
        } else {
            1..=1
        }
    }

    /// Window around the current page, when separated from both ends.
    pub fn get_inner_pages(&self) -> Option<RangeInclusive<usize>> {
        if self.head_merged() || self.tail_merged() {
            None
        } else {
            Some((self.this_page - PAGINATOR_LOOK_AHEAD)..=(self.this_page + PAGINATOR_LOOK_AHEAD))
        }
    }

    /// Pages shown after the last ellipsis.
    pub fn get_last_pages(&self) -> Option<RangeInclusive<usize>> {
        let first_end = *self.get_first_pages().end();
        if first_end >= self.page_count {
            None
        } else if self.tail_merged() {
            let start = self
                .this_page
                .saturating_sub(PAGINATOR_LOOK_AHEAD)
                .max(first_end + 1);
            Some(start..=self.page_count)
        } else {
            Some(self.page_count..=self.page_count)
        }
    }

    /// True when the last pages do not directly follow the pages before them.
    pub fn has_gap_before_last(&self) -> bool {
        let previous_end = match self.get_inner_pages() {
            Some(inner) => *inner.end(),
            None => *self.get_first_pages().end(),
        };
        match self.get_last_pages() {
            Some(last) => *last.start() > previous_end + 1,
            None => false,
        }
    }

    pub fn as_html(&self) -> String {
        if self.has_pages() {
            let mut buffer = String::new();
            let template = PaginatorTemplate { paginator: self };
            if template.render_into(&mut buffer).is_err() {
                "[Paginator Util Error]".to_owned()
            } else {
                buffer
            }
        } else {
            "".to_owned()
        }
    }
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Slices an in-memory, already ordered list.
pub fn paginate_slice<T: Clone>(
    items: &[T],
    base_url: &str,
    query: &PageQuery,
    per_page: usize,
) -> Page<T> {
    let paginator = Paginator::new(base_url, query, items.len(), per_page);
    let start = (paginator.this_page - 1) * per_page;
    let end = (start + per_page).min(items.len());
    Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        paginator,
    }
}

/// Counts then fetches one page of a query.
pub async fn paginate_query<'db, C, P>(
    db: &'db C,
    query: P,
    base_url: &str,
    page_query: &PageQuery,
    per_page: usize,
) -> Result<Page<<P::Selector as SelectorTrait>::Item>, DbErr>
where
    C: ConnectionTrait,
    P: PaginatorTrait<'db, C>,
{
    let pages = query.paginate(db, per_page);
    let paginator = Paginator::new(base_url, page_query, pages.num_items().await?, per_page);
    let items = pages.fetch_page(paginator.this_page - 1).await?;
    Ok(Page { items, paginator })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginator(this_page: usize, page_count: usize) -> Paginator {
        Paginator {
            base_url: "/".to_owned(),
            this_page,
            page_count,
            item_count: page_count * 10,
        }
    }

    fn query(page: &str) -> PageQuery {
        PageQuery {
            page: Some(page.to_owned()),
        }
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(15, 10), 2);
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(None, 3), 1);
        assert_eq!(clamp_page(Some("2"), 3), 2);
        assert_eq!(clamp_page(Some("abc"), 3), 1);
        assert_eq!(clamp_page(Some(""), 3), 1);
        assert_eq!(clamp_page(Some("0"), 3), 1);
        assert_eq!(clamp_page(Some("-4"), 3), 1);
        assert_eq!(clamp_page(Some("99"), 3), 3);
        assert_eq!(clamp_page(Some("99999999999999999999"), 3), 1);
        assert_eq!(clamp_page(Some("1"), 0), 1);
    }

    #[test]
    fn test_last_page_holds_remainder() {
        let items: Vec<usize> = (0..15).collect();
        let first = paginate_slice(&items, "/", &PageQuery::default(), 10);
        assert_eq!(first.len(), 10);
        assert_eq!(first.paginator.page_count, 2);

        let last = paginate_slice(&items, "/", &query("2"), 10);
        assert_eq!(last.items, vec![10, 11, 12, 13, 14]);

        let exact: Vec<usize> = (0..20).collect();
        let last = paginate_slice(&exact, "/", &query("2"), 10);
        assert_eq!(last.len(), 10);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let items: Vec<usize> = (0..15).collect();
        let page = paginate_slice(&items, "/", &query("7"), 10);
        assert_eq!(page.paginator.this_page, 2);
        assert_eq!(page.len(), 5);

        let empty: Vec<usize> = Vec::new();
        let page = paginate_slice(&empty, "/", &query("3"), 10);
        assert_eq!(page.paginator.this_page, 1);
        assert!(page.is_empty());
    }

    #[test]
    fn test_page_windows() {
        let p = paginator(1, 1);
        assert!(!p.has_pages());
        assert_eq!(p.as_html(), "");

        // [1] 2 3 ... 13
        let p = paginator(1, 13);
        assert_eq!(p.get_first_pages(), 1..=3);
        assert_eq!(p.get_inner_pages(), None);
        assert_eq!(p.get_last_pages(), Some(13..=13));

        // 1 ... 4 5 [6] 7 8 ... 13
        let p = paginator(6, 13);
        assert_eq!(p.get_first_pages(), 1..=1);
        assert_eq!(p.get_inner_pages(), Some(4..=8));
        assert_eq!(p.get_last_pages(), Some(13..=13));

        // 1 ... 9 10 [11] 12 13
        let p = paginator(11, 13);
        assert_eq!(p.get_first_pages(), 1..=1);
        assert_eq!(p.get_inner_pages(), None);
        assert_eq!(p.get_last_pages(), Some(9..=13));
        assert!(p.has_gap_before_last());

        // 1 2 3 4 [5] 6 7 8 9
        let p = paginator(5, 9);
        assert_eq!(p.get_first_pages(), 1..=7);
        assert_eq!(p.get_last_pages(), Some(8..=9));
        assert!(!p.has_gap_before_last());

        // 1 2 [3] 4
        let p = paginator(3, 4);
        assert_eq!(p.get_first_pages(), 1..=4);
        assert_eq!(p.get_last_pages(), None);
    }

    #[test]
    fn test_paginator_html_links() {
        let p = Paginator {
            base_url: "/group/cats/".to_owned(),
            this_page: 2,
            page_count: 3,
            item_count: 25,
        };
        let html = p.as_html();
        assert!(html.contains("/group/cats/?page=1"));
        assert!(html.contains("/group/cats/?page=3"));
    }
}
