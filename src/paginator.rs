use serde::Serialize;

/// One page of a feed listing. Pages are numbered from 1.
#[derive(Debug, PartialEq, Serialize)]
pub struct Page<'a, T> {
    pub number: usize,
    pub page_count: usize,
    pub total: usize,
    pub items: &'a [T],
}

impl<T> Page<'_, T> {
    pub fn has_next(&self) -> bool {
        self.number < self.page_count
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

pub struct Paginator<'a, T> {
    items: &'a [T],
    page_size: usize,
}

impl<'a, T> Paginator<'a, T> {
    /// A page size of zero is treated as one.
    pub fn new(items: &'a [T], page_size: usize) -> Self {
        Paginator {
            items,
            page_size: page_size.max(1),
        }
    }

    pub fn page_count(&self) -> usize {
        self.items.len().div_ceil(self.page_size)
    }

    /// Page 1 of an empty list exists and is empty.
    pub fn page(&self, number: usize) -> Result<Page<'a, T>, String> {
        let page_count = self.page_count();
        match number {
            0 => return Err("Page has to be greater than 0".to_string()),
            1 => {}
            x if x > page_count => return Err(format!("Page has to be less than or equal to {}", page_count)),
            _ => {}
        };

        let start = ((number - 1) * self.page_size).min(self.items.len());
        let end = (start + self.page_size).min(self.items.len());

        Ok(Page {
            number,
            page_count,
            total: self.items.len(),
            items: &self.items[start..end],
        })
    }
}
