/// Page slicing for every feed view.
///
/// A feed is counted first, then only the requested window is fetched. Page
/// numbers are 1-based; anything unparseable or below 1 means page 1, anything
/// past the end means the last page. An empty feed still has one (empty) page.
use serde::{Deserialize, Serialize};

/// `?page=` query parameter, kept as raw text so that junk values fall back
/// to the first page instead of failing extraction
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

/// The slice of the result set a page covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub offset: usize,
    pub limit: usize,
}

impl Paginator {
    pub fn new(count: usize, per_page: usize) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn num_pages(&self) -> usize {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    /// Resolve a raw `page` parameter to a valid page window
    pub fn window(&self, raw: Option<&str>) -> PageWindow {
        let requested = raw.map(str::trim).map_or(1, |value| {
            value.parse::<i64>().unwrap_or_else(|_| {
                // digits too large for i64 are still a page past the end
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    i64::MAX
                } else {
                    1
                }
            })
        });

        let number = if requested < 1 {
            1
        } else {
            usize::try_from(requested)
                .unwrap_or(usize::MAX)
                .min(self.num_pages())
        };

        let offset = (number - 1) * self.per_page;
        let limit = self.per_page.min(self.count.saturating_sub(offset));

        PageWindow {
            number,
            offset,
            limit,
        }
    }

    pub fn page<T>(&self, window: PageWindow, object_list: Vec<T>) -> Page<T> {
        Page {
            object_list,
            number: window.number,
            num_pages: self.num_pages(),
            count: self.count,
            per_page: self.per_page,
        }
    }
}

/// One rendered page of a feed
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub per_page: usize,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            object_list: self.object_list.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_pages_rounds_up() {
        assert_eq!(Paginator::new(13, 10).num_pages(), 2);
        assert_eq!(Paginator::new(20, 10).num_pages(), 2);
        assert_eq!(Paginator::new(21, 10).num_pages(), 3);
        assert_eq!(Paginator::new(1, 10).num_pages(), 1);
    }

    #[test]
    fn empty_result_has_one_empty_page() {
        let paginator = Paginator::new(0, 10);
        assert_eq!(paginator.num_pages(), 1);
        assert_eq!(
            paginator.window(Some("1")),
            PageWindow {
                number: 1,
                offset: 0,
                limit: 0
            }
        );
    }

    #[test]
    fn each_page_holds_at_most_per_page_items() {
        let paginator = Paginator::new(13, 10);
        for k in 1..=paginator.num_pages() {
            let window = paginator.window(Some(&k.to_string()));
            let expected = 10usize.min(13 - (k - 1) * 10);
            assert_eq!(window.limit, expected, "page {k}");
            assert_eq!(window.offset, (k - 1) * 10);
        }
    }

    #[test]
    fn missing_or_invalid_page_defaults_to_first() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.window(None).number, 1);
        assert_eq!(paginator.window(Some("abc")).number, 1);
        assert_eq!(paginator.window(Some("")).number, 1);
    }

    #[test]
    fn zero_and_negative_pages_behave_like_page_one() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.window(Some("0")), paginator.window(Some("1")));
        assert_eq!(paginator.window(Some("-3")), paginator.window(Some("1")));
    }

    #[test]
    fn page_past_the_end_clamps_to_last() {
        let paginator = Paginator::new(25, 10);
        let window = paginator.window(Some("99"));
        assert_eq!(window.number, 3);
        assert_eq!(window.offset, 20);
        assert_eq!(window.limit, 5);
    }

    #[test]
    fn overflowing_page_number_clamps_to_last() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.window(Some("99999999999999999999")).number, 3);
        assert_eq!(paginator.window(Some("-99999999999999999999")).number, 1);
    }

    #[test]
    fn page_navigation_flags() {
        let paginator = Paginator::new(25, 10);

        let first = paginator.page(paginator.window(None), vec![0; 10]);
        assert!(first.has_next());
        assert!(!first.has_previous());

        let last = paginator.page(paginator.window(Some("3")), vec![0; 5]);
        assert!(!last.has_next());
        assert!(last.has_previous());
        assert_eq!(last.len(), 5);
    }
}
