//! Page requests and result pages.

use crate::sort::Sort;
use repobridge_core::{Error, Result};

/// A zero-based page number, a positive page size and an optional sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u64,
    size: u64,
    sort: Sort,
}

impl PageRequest {
    /// Unsorted request. A size of zero is a usage error.
    pub fn of(page: u64, size: u64) -> Result<Self> {
        Self::of_sorted(page, size, Sort::unsorted())
    }

    pub fn of_sorted(page: u64, size: u64, sort: Sort) -> Result<Self> {
        if size == 0 {
            return Err(Error::Usage("page size must be greater than zero".into()));
        }
        Ok(Self { page, size, sort })
    }

    /// First page of the given size.
    pub fn first_of(size: u64) -> Result<Self> {
        Self::of(0, size)
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// `page * size`, or `None` when that overflows.
    pub fn offset(&self) -> Option<u64> {
        self.page.checked_mul(self.size)
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    pub fn previous_or_first(&self) -> Self {
        Self {
            page: self.page.saturating_sub(1),
            ..self.clone()
        }
    }

    pub fn first(&self) -> Self {
        Self {
            page: 0,
            ..self.clone()
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    pageable: PageRequest,
    total: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: PageRequest, total: u64) -> Self {
        Self {
            content,
            pageable,
            total,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn pageable(&self) -> &PageRequest {
        &self.pageable
    }

    pub fn total_elements(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.pageable.size())
    }

    /// Zero-based page number.
    pub fn number(&self) -> u64 {
        self.pageable.page()
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn has_next(&self) -> bool {
        self.number().saturating_add(1) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.pageable.has_previous()
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    /// Convert the content, keeping paging information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            pageable: self.pageable,
            total: self.total,
        }
    }
}
