//! Read-only farm views.
//!
//! Each view is a small loading/error/data machine. Fetches are split into
//! `begin_fetch` (returns a ticket) and `finish`, so a result that arrives
//! after the view moved on (new farm id, unmount, logout) is dropped.

use tokio::sync::watch;
use tracing::debug;

use crate::errors::GatewayError;
use crate::gateway::FarmBackend;
use crate::models::Farm;
use crate::session::SessionStatus;

pub const MSG_LIST_FAILED: &str = "농장 목록을 불러오는 데 실패했습니다. 잠시 후 다시 시도해주세요.";
pub const MSG_DETAIL_FAILED: &str = "농장 정보를 불러오는데 실패했습니다.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState<T> {
    Loading,
    Error(String),
    Loaded(T),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ViewState::Loaded(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

/// Shared loading machinery for the views.
#[derive(Debug)]
struct Resource<T> {
    state: ViewState<T>,
    generation: u64,
    mounted: bool,
    error_message: &'static str,
}

impl<T> Resource<T> {
    fn new(error_message: &'static str) -> Self {
        Self {
            state: ViewState::Loading,
            generation: 0,
            mounted: true,
            error_message,
        }
    }

    fn begin(&mut self) -> FetchTicket {
        self.generation += 1;
        self.state = ViewState::Loading;
        FetchTicket {
            generation: self.generation,
        }
    }

    /// Invalidate any in-flight fetch and drop loaded data.
    fn reset(&mut self) {
        self.generation += 1;
        self.state = ViewState::Loading;
    }

    fn finish(&mut self, ticket: FetchTicket, result: Result<T, GatewayError>) -> bool {
        if !self.mounted || ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                mounted = self.mounted,
                "Dropping stale fetch result"
            );
            return false;
        }
        self.state = match result {
            Ok(data) => ViewState::Loaded(data),
            Err(err) => {
                debug!(error = %err, "Fetch failed");
                ViewState::Error(self.error_message.to_string())
            }
        };
        true
    }
}

/// The signed-in user's farms.
#[derive(Debug)]
pub struct FarmListView {
    resource: Resource<Vec<Farm>>,
    session: Option<watch::Receiver<SessionStatus>>,
}

impl Default for FarmListView {
    fn default() -> Self {
        Self::new()
    }
}

impl FarmListView {
    pub fn new() -> Self {
        Self {
            resource: Resource::new(MSG_LIST_FAILED),
            session: None,
        }
    }

    /// Purge cached farms whenever the session reports a logout.
    pub fn with_session(mut self, rx: watch::Receiver<SessionStatus>) -> Self {
        self.session = Some(rx);
        self
    }

    pub fn state(&self) -> &ViewState<Vec<Farm>> {
        &self.resource.state
    }

    /// Drop loaded farms if the session has logged out. Returns `true` when
    /// something was purged.
    pub fn sync_session(&mut self) -> bool {
        let Some(rx) = self.session.as_mut() else {
            return false;
        };
        if !rx.has_changed().unwrap_or(false) {
            return false;
        }
        if *rx.borrow_and_update() == SessionStatus::LoggedOut {
            debug!("Session ended, purging farm list");
            self.resource.reset();
            return true;
        }
        false
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.sync_session();
        self.resource.begin()
    }

    pub fn finish(&mut self, ticket: FetchTicket, result: Result<Vec<Farm>, GatewayError>) -> bool {
        // A logout while the request was in flight invalidates the ticket.
        self.sync_session();
        self.resource.finish(ticket, result)
    }

    pub async fn load(&mut self, backend: &dyn FarmBackend) -> &ViewState<Vec<Farm>> {
        let ticket = self.begin_fetch();
        let result = backend.list_farms().await;
        self.finish(ticket, result);
        self.state()
    }

    pub fn unmount(&mut self) {
        self.resource.mounted = false;
    }
}

/// One farm with its devices, keyed by farm id.
#[derive(Debug)]
pub struct FarmDetailView {
    farm_id: i64,
    resource: Resource<Farm>,
}

impl FarmDetailView {
    pub fn new(farm_id: i64) -> Self {
        Self {
            farm_id,
            resource: Resource::new(MSG_DETAIL_FAILED),
        }
    }

    pub fn farm_id(&self) -> i64 {
        self.farm_id
    }

    pub fn state(&self) -> &ViewState<Farm> {
        &self.resource.state
    }

    /// Point the view at another farm. Returns `true` when the id changed and
    /// a refetch is needed; any in-flight fetch for the old id is invalidated.
    pub fn set_farm_id(&mut self, farm_id: i64) -> bool {
        if farm_id == self.farm_id {
            return false;
        }
        self.farm_id = farm_id;
        self.resource.reset();
        true
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.resource.begin()
    }

    pub fn finish(&mut self, ticket: FetchTicket, result: Result<Farm, GatewayError>) -> bool {
        self.resource.finish(ticket, result)
    }

    pub async fn load(&mut self, backend: &dyn FarmBackend) -> &ViewState<Farm> {
        let ticket = self.begin_fetch();
        let result = backend.get_farm(self.farm_id).await;
        self.finish(ticket, result);
        self.state()
    }

    pub fn unmount(&mut self) {
        self.resource.mounted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::api::mock::{ScriptedBackend, http_error};
    use crate::session::Session;

    fn farm(id: i64, name: &str) -> Farm {
        Farm {
            id,
            name: name.to_string(),
            address: Some("서울".into()),
            detailed_address: None,
            description: None,
            devices: Vec::new(),
        }
    }

    #[test]
    fn test_views_start_loading() {
        assert!(FarmListView::new().state().is_loading());
        assert!(FarmDetailView::new(1).state().is_loading());
    }

    #[tokio::test]
    async fn test_list_loads_farms() {
        let backend = ScriptedBackend::new();
        backend.push_list(Ok(vec![farm(1, "A"), farm(2, "B")]));
        let mut view = FarmListView::new();

        let state = view.load(&backend).await;
        assert_eq!(state.data().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_list_server_error_shows_error_state() {
        let backend = ScriptedBackend::new();
        backend.push_list(Err(http_error("/api/farms", 500, Some("boom"))));
        let mut view = FarmListView::new();

        let state = view.load(&backend).await;
        assert_eq!(state, &ViewState::Error(MSG_LIST_FAILED.to_string()));
    }

    #[test]
    fn test_result_after_unmount_is_dropped() {
        let mut view = FarmListView::new();
        let ticket = view.begin_fetch();
        view.unmount();
        assert!(!view.finish(ticket, Ok(vec![farm(1, "A")])));
        assert!(view.state().is_loading());
    }

    #[test]
    fn test_superseded_fetch_is_dropped() {
        let mut view = FarmListView::new();
        let old = view.begin_fetch();
        let new = view.begin_fetch();
        assert!(view.finish(new, Ok(vec![farm(2, "new")])));
        assert!(!view.finish(old, Ok(vec![farm(1, "old")])));
        assert_eq!(view.state().data().unwrap()[0].name, "new");
    }

    #[tokio::test]
    async fn test_logout_purges_cached_farms() {
        let session = Session::in_memory();
        session.login("t").unwrap();
        let backend = ScriptedBackend::new();
        backend.push_list(Ok(vec![farm(1, "A")]));
        let mut view = FarmListView::new().with_session(session.subscribe());
        view.load(&backend).await;
        assert!(view.state().data().is_some());

        session.logout().unwrap();
        assert!(view.sync_session());
        assert!(view.state().data().is_none());
    }

    #[test]
    fn test_logout_during_fetch_drops_result() {
        let session = Session::in_memory();
        session.login("t").unwrap();
        let mut view = FarmListView::new().with_session(session.subscribe());
        let ticket = view.begin_fetch();

        session.logout().unwrap();
        assert!(!view.finish(ticket, Ok(vec![farm(1, "A")])));
        assert!(view.state().data().is_none());
    }

    #[tokio::test]
    async fn test_detail_loads_and_refetches_on_id_change() {
        let backend = ScriptedBackend::new();
        backend.push_farm(Ok(farm(1, "first")));
        backend.push_farm(Ok(farm(2, "second")));
        let mut view = FarmDetailView::new(1);

        view.load(&backend).await;
        assert_eq!(view.state().data().unwrap().name, "first");

        assert!(!view.set_farm_id(1));
        assert!(view.set_farm_id(2));
        assert!(view.state().is_loading());
        view.load(&backend).await;
        assert_eq!(view.state().data().unwrap().name, "second");
    }

    #[test]
    fn test_detail_result_for_old_id_is_dropped() {
        let mut view = FarmDetailView::new(1);
        let ticket = view.begin_fetch();
        view.set_farm_id(2);
        assert!(!view.finish(ticket, Ok(farm(1, "old"))));
        assert!(view.state().is_loading());
    }

    #[tokio::test]
    async fn test_detail_error_message() {
        let backend = ScriptedBackend::new();
        let mut view = FarmDetailView::new(99);
        let state = view.load(&backend).await;
        assert_eq!(state, &ViewState::Error(MSG_DETAIL_FAILED.to_string()));
    }
}
