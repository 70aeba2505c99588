//! Screen navigation and notices.
//!
//! `App` is the single owner of client state: the session handle, the
//! backend, the current screen and a queue of notices (toasts). Farm screens
//! are protected; opening one while logged out lands on the auth screen.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::{self, AuthScreen, AuthTab, LoginForm, SignupForm};
use crate::errors::FormError;
use crate::farm::form::MSG_SUBMIT_FAILED;
use crate::farm::{FarmDetailView, FarmForm, FarmListView};
use crate::gateway::FarmBackend;
use crate::session::Session;

pub const MSG_LOGIN_REQUIRED: &str = "로그인이 필요합니다.";
pub const MSG_FARM_CREATED: &str = "농장이 성공적으로 등록되었습니다.";
pub const MSG_LOGGED_OUT: &str = "로그아웃되었습니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Auth,
    FarmList,
    AddFarm,
    FarmDetail(i64),
}

impl Route {
    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Auth)
    }
}

pub enum Screen {
    Auth(AuthScreen),
    FarmList(FarmListView),
    AddFarm(FarmForm),
    FarmDetail(FarmDetailView),
}

impl Screen {
    pub fn route(&self) -> Route {
        match self {
            Screen::Auth(_) => Route::Auth,
            Screen::FarmList(_) => Route::FarmList,
            Screen::AddFarm(_) => Route::AddFarm,
            Screen::FarmDetail(view) => Route::FarmDetail(view.farm_id()),
        }
    }
}

pub struct App {
    session: Arc<Session>,
    backend: Arc<dyn FarmBackend>,
    screen: Screen,
    notices: Vec<Notice>,
}

impl App {
    /// Start on the farm list when a session was restored, otherwise on the
    /// auth screen. Nothing is fetched until [`App::refresh`] or
    /// [`App::open`].
    pub fn new(session: Arc<Session>, backend: Arc<dyn FarmBackend>) -> Self {
        let screen = if session.is_authenticated() {
            Screen::FarmList(FarmListView::new().with_session(session.subscribe()))
        } else {
            Screen::Auth(AuthScreen::default())
        };
        Self {
            session,
            backend,
            screen,
            notices: Vec::new(),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn backend(&self) -> Arc<dyn FarmBackend> {
        self.backend.clone()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn route(&self) -> Route {
        self.screen.route()
    }

    /// The add-farm form, when it is the current screen.
    pub fn farm_form(&mut self) -> Option<&mut FarmForm> {
        match &mut self.screen {
            Screen::AddFarm(form) => Some(form),
            _ => None,
        }
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        debug!(?level, %message, "Notice");
        self.notices.push(Notice { level, message });
    }

    /// Drain pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Switch screens without fetching. Protected routes redirect to the
    /// auth screen when logged out; the route actually taken is returned.
    pub fn navigate(&mut self, route: Route) -> Route {
        if route.is_protected() && !self.session.is_authenticated() {
            debug!(?route, "Redirecting to auth");
            if matches!(route, Route::FarmDetail(_)) {
                self.notify(NoticeLevel::Error, MSG_LOGIN_REQUIRED);
            }
            self.screen = Screen::Auth(AuthScreen::default());
            return Route::Auth;
        }

        if let Screen::FarmDetail(view) = &mut self.screen
            && let Route::FarmDetail(id) = route
        {
            view.set_farm_id(id);
            return route;
        }

        self.unmount_current();
        self.screen = match route {
            Route::Auth => Screen::Auth(AuthScreen::default()),
            Route::FarmList => {
                Screen::FarmList(FarmListView::new().with_session(self.session.subscribe()))
            }
            Route::AddFarm => Screen::AddFarm(FarmForm::new()),
            Route::FarmDetail(id) => Screen::FarmDetail(FarmDetailView::new(id)),
        };
        route
    }

    fn unmount_current(&mut self) {
        match &mut self.screen {
            Screen::FarmList(view) => view.unmount(),
            Screen::FarmDetail(view) => view.unmount(),
            Screen::Auth(_) | Screen::AddFarm(_) => {}
        }
    }

    /// Fetch data for the current screen, if it shows any.
    pub async fn refresh(&mut self) {
        let backend = self.backend.clone();
        match &mut self.screen {
            Screen::FarmList(view) => {
                view.load(backend.as_ref()).await;
            }
            Screen::FarmDetail(view) => {
                view.load(backend.as_ref()).await;
            }
            Screen::Auth(_) | Screen::AddFarm(_) => {}
        }
    }

    /// Navigate and load.
    pub async fn open(&mut self, route: Route) -> Route {
        let taken = self.navigate(route);
        self.refresh().await;
        taken
    }

    pub async fn login(&mut self, form: &LoginForm) -> bool {
        match auth::login(form, self.backend.as_ref(), &self.session).await {
            Ok(()) => {
                self.notify(NoticeLevel::Success, auth::MSG_LOGIN_SUCCESS);
                self.open(Route::FarmList).await;
                true
            }
            Err(err) => {
                self.notify(NoticeLevel::Error, err.to_string());
                false
            }
        }
    }

    /// On success the auth screen flips to its login tab.
    pub async fn signup(&mut self, form: &SignupForm) -> bool {
        match auth::signup(form, self.backend.as_ref()).await {
            Ok(()) => {
                self.notify(NoticeLevel::Success, auth::MSG_SIGNUP_SUCCESS);
                if let Screen::Auth(screen) = &mut self.screen {
                    screen.tab = AuthTab::Login;
                }
                true
            }
            Err(err) => {
                self.notify(NoticeLevel::Error, err.to_string());
                false
            }
        }
    }

    pub fn logout(&mut self) {
        if let Err(err) = self.session.logout() {
            warn!(error = %err, "Session cleared in memory but not on disk");
            self.notify(NoticeLevel::Error, err.to_string());
        } else {
            self.notify(NoticeLevel::Success, MSG_LOGGED_OUT);
        }
        self.navigate(Route::Auth);
    }

    /// Submit the add-farm form. On success the draft is discarded and the
    /// farm list is shown; on failure the form stays as it was.
    pub async fn submit_farm(&mut self) -> bool {
        let backend = self.backend.clone();
        let Screen::AddFarm(form) = &mut self.screen else {
            return false;
        };
        match form.submit(backend.as_ref()).await {
            Ok(_) => {
                self.notify(NoticeLevel::Success, MSG_FARM_CREATED);
                self.open(Route::FarmList).await;
                true
            }
            Err(err) => {
                let message = match &err {
                    FormError::Gateway(g) if g.is_network() => {
                        crate::errors::MSG_SERVER_UNREACHABLE.to_string()
                    }
                    other => other.user_message(MSG_SUBMIT_FAILED),
                };
                self.notify(NoticeLevel::Error, message);
                false
            }
        }
    }
}
