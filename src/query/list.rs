use super::params::ListParams;
use crate::api::Page;
use crate::error::Result;
use log::debug;

/// Render branch of a list. Data is only present in `Ready`.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Ready(Page<T>),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn page(&self) -> Option<&Page<T>> {
        match self {
            LoadState::Ready(page) => Some(page),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Issued by [`ListView::begin`]; carries the parameters to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTicket {
    generation: u64,
    params: ListParams,
}

impl ListTicket {
    pub fn params(&self) -> &ListParams {
        &self.params
    }
}

/// A paginated list bound to its parameters.
///
/// Only the most recently issued ticket may settle the state; responses to
/// superseded requests are dropped.
#[derive(Debug, Clone)]
pub struct ListView<T> {
    params: ListParams,
    state: LoadState<T>,
    generation: u64,
}

impl<T> ListView<T> {
    pub fn new(params: ListParams) -> Self {
        Self {
            params,
            state: LoadState::Idle,
            generation: 0,
        }
    }

    pub fn params(&self) -> &ListParams {
        &self.params
    }

    /// Change the parameters; the caller reloads afterwards.
    pub fn update_params(&mut self, f: impl FnOnce(&mut ListParams)) {
        f(&mut self.params);
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn begin(&mut self) -> ListTicket {
        self.generation += 1;
        self.state = LoadState::Loading;
        ListTicket {
            generation: self.generation,
            params: self.params.clone(),
        }
    }

    /// Settle the ticket's request. Returns `false` when the ticket was
    /// superseded and the result discarded.
    pub fn finish(&mut self, ticket: ListTicket, result: Result<Page<T>>) -> bool {
        if ticket.generation != self.generation {
            debug!(
                "Dropping list response {} superseded by {}",
                ticket.generation, self.generation
            );
            return false;
        }
        self.state = match result {
            Ok(page) => LoadState::Ready(page),
            Err(e) => LoadState::Failed(e.to_string()),
        };
        true
    }
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self::new(ListParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Pagination;
    use crate::error::Error;

    fn page(items: &[&str], page: u32) -> Page<String> {
        Page {
            data: items.iter().map(|s| s.to_string()).collect(),
            pagination: Pagination {
                total: items.len() as u64,
                page,
                limit: 10,
                pages: 1,
            },
        }
    }

    #[test]
    fn loading_then_ready() {
        let mut view = ListView::default();
        assert_eq!(view.state(), &LoadState::Idle);
        let ticket = view.begin();
        assert!(view.state().is_loading());
        assert!(view.state().page().is_none());
        assert!(view.finish(ticket, Ok(page(&["a"], 1))));
        assert_eq!(view.state().page().unwrap().data, vec!["a"]);
    }

    #[test]
    fn superseded_response_is_dropped() {
        let mut view: ListView<String> = ListView::default();
        let slow = view.begin();
        view.update_params(|p| p.set_search("breaker"));
        let fast = view.begin();
        assert_eq!(fast.params().search(), Some("breaker"));

        assert!(view.finish(fast, Ok(page(&["breaker"], 1))));
        assert!(!view.finish(slow, Ok(page(&["stale"], 3))));
        assert_eq!(view.state().page().unwrap().data, vec!["breaker"]);
    }

    #[test]
    fn failure_is_a_render_branch() {
        let mut view: ListView<String> = ListView::default();
        let ticket = view.begin();
        view.finish(
            ticket,
            Err(Error::Api {
                status: 500,
                message: "boom".to_string(),
            }),
        );
        assert_eq!(view.state().error(), Some("API error (500): boom"));
    }
}
