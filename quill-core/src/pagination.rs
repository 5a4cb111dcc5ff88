// Quill - A minimal multi-user blog built with Rust
// Copyright (C) 2025 Quill Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::Serialize;

/// One page of a listing, plus the numbers needed to render page links.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_num: Option<u32>,
    pub next_num: Option<u32>,
    /// Page links with `None` marking an elided gap.
    pub page_numbers: Vec<Option<u32>>,
}

impl Pagination {
    /// `page` is 1-based. A `per_page` of 0 is treated as 1.
    pub fn new(page: u32, per_page: u32, total: i64) -> Self {
        let per_page = per_page.max(1);
        let total = total.max(0);
        let pages = ((total as u64).div_ceil(per_page as u64)) as u32;

        let has_prev = page > 1;
        let has_next = page < pages;

        let mut pagination = Self {
            page,
            per_page,
            total,
            pages,
            has_prev,
            has_next,
            prev_num: has_prev.then(|| page - 1),
            next_num: has_next.then(|| page + 1),
            page_numbers: Vec::new(),
        };
        pagination.page_numbers = pagination.iter_pages(2, 2, 5, 2);
        pagination
    }

    /// Row offset of the first item on this page.
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    /// Whether this page lies past the end of the listing. Page 1 of an
    /// empty listing is still in range so it can render "no posts".
    pub fn is_out_of_range(&self) -> bool {
        self.page == 0 || (self.page > 1 && self.page > self.pages)
    }

    /// Page numbers to link to: the first `left_edge` pages, a window around
    /// the current page and the last `right_edge` pages, with `None` where
    /// pages were skipped.
    pub fn iter_pages(
        &self,
        left_edge: u32,
        left_current: u32,
        right_current: u32,
        right_edge: u32,
    ) -> Vec<Option<u32>> {
        let mut result = Vec::new();
        let mut last = 0;
        let page = self.page as i64;

        for num in 1..=self.pages {
            let n = num as i64;
            let near_current = n > page - left_current as i64 - 1 && n < page + right_current as i64;
            if num <= left_edge || near_current || num > self.pages.saturating_sub(right_edge) {
                if last + 1 != num {
                    result.push(None);
                }
                result.push(Some(num));
                last = num;
            }
        }

        result
    }
}
