use crate::config::DEFAULT_PAGE_SIZE;
use std::collections::BTreeMap;

/// Filter value meaning "no filter".
pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// User-controlled list parameters.
///
/// Any change to search, a filter, the sort or the page size puts the list
/// back on page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    page: u32,
    limit: u32,
    search: Option<String>,
    filters: BTreeMap<String, String>,
    sort: Option<(String, SortOrder)>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ListParams {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            search: None,
            filters: BTreeMap::new(),
            sort: None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    pub fn sort(&self) -> Option<(&str, SortOrder)> {
        self.sort.as_ref().map(|(field, order)| (field.as_str(), *order))
    }

    /// Go to `page`; pages start at 1.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self) {
        self.page = self.page.saturating_add(1);
    }

    pub fn previous_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    pub fn set_limit(&mut self, limit: u32) {
        let limit = limit.max(1);
        if limit != self.limit {
            self.limit = limit;
            self.page = 1;
        }
    }

    pub fn set_search(&mut self, search: &str) {
        let search = Some(search.trim().to_string()).filter(|s| !s.is_empty());
        if search != self.search {
            self.search = search;
            self.page = 1;
        }
    }

    /// Set a filter. An empty value or [`ALL`] removes it.
    pub fn set_filter(&mut self, key: &str, value: &str) {
        let value = value.trim();
        let changed = if value.is_empty() || value == ALL {
            self.filters.remove(key).is_some()
        } else {
            self.filters.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        };
        if changed {
            self.page = 1;
        }
    }

    pub fn clear_filters(&mut self) {
        if !self.filters.is_empty() {
            self.filters.clear();
            self.page = 1;
        }
    }

    pub fn set_sort(&mut self, field: &str, order: SortOrder) {
        let sort = Some((field.to_string(), order));
        if sort != self.sort {
            self.sort = sort;
            self.page = 1;
        }
    }

    /// Query-string pairs, with empty values left out.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(search) = &self.search {
            query.push(("search".to_string(), search.clone()));
        }
        for (key, value) in &self.filters {
            query.push((key.clone(), value.clone()));
        }
        if let Some((field, order)) = &self.sort {
            query.push(("sortBy".to_string(), field.clone()));
            let order = match order {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            query.push(("sortOrder".to_string(), order.to_string()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_page(page: u32) -> ListParams {
        let mut params = ListParams::new(20);
        params.set_page(page);
        params
    }

    #[test]
    fn every_parameter_change_resets_page() {
        let mut params = on_page(4);
        params.set_search("cable");
        assert_eq!(params.page(), 1);

        let mut params = on_page(4);
        params.set_filter("category", "lighting");
        assert_eq!(params.page(), 1);

        let mut params = on_page(4);
        params.set_sort("price", SortOrder::Desc);
        assert_eq!(params.page(), 1);

        let mut params = on_page(4);
        params.set_limit(50);
        assert_eq!(params.page(), 1);
    }

    #[test]
    fn setting_the_same_value_keeps_page() {
        let mut params = ListParams::new(20);
        params.set_filter("status", "pending");
        params.set_page(3);
        params.set_filter("status", "pending");
        params.set_search("");
        params.set_limit(20);
        assert_eq!(params.page(), 3);
    }

    #[test]
    fn all_sentinel_removes_filter() {
        let mut params = ListParams::new(10);
        params.set_filter("status", "active");
        params.set_page(2);
        params.set_filter("status", ALL);
        assert_eq!(params.filter("status"), None);
        assert_eq!(params.page(), 1);
    }

    #[test]
    fn query_pairs() {
        let mut params = ListParams::new(10);
        params.set_search("  socket ");
        params.set_filter("brand", "b1");
        params.set_filter("category", "");
        params.set_sort("createdAt", SortOrder::Desc);
        params.next_page();
        assert_eq!(
            params.to_query(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("search".to_string(), "socket".to_string()),
                ("brand".to_string(), "b1".to_string()),
                ("sortBy".to_string(), "createdAt".to_string()),
                ("sortOrder".to_string(), "desc".to_string()),
            ]
        );
    }

    #[test]
    fn page_never_drops_below_one() {
        let mut params = ListParams::new(0);
        params.previous_page();
        params.set_page(0);
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 1);
    }
}
