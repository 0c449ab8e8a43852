//! Per-view load, submit and result handling.
//!
//! [`FlowController`] owns the page: the document, the view switcher, the
//! click bindings and the session user threaded through registration. The
//! page lock is never held across a backend call, so a view can be switched
//! while a fragment is still in flight.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use client_core::CantinaBackend;
use shared::domain::{UserId, UserRef, ViewId};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::{
    admin,
    dom::{Document, NodeId},
    error::FlowError,
    host::Host,
    nav::{Bindings, NavController, UiAction},
    views::{self, ViewSwitcher},
};

mod auth;
mod availchecks;
mod profile;
mod registration;

pub use availchecks::AvailCheckOutcome;

#[derive(Debug, Clone, Default)]
pub struct FlowSettings {
    /// Run accept/reject while rendering the availability-check list instead of
    /// on click.
    pub eager_availcheck_listeners: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    RegisterUser,
    RegisterStandin,
    Login,
    Profile,
    AcceptAvailCheck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend answered `status: success`.
    Accepted,
    /// The backend answered `status: error`; its message is on the page.
    Rejected,
    /// Required fields are empty; nothing was sent.
    Invalid(Vec<String>),
    /// The same flow is still waiting for a response.
    Busy,
    /// The backend rendered a full page and the client reloaded.
    Reloaded,
    /// The request failed; the failure was logged.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Unbound,
    Navigated(Option<ViewId>),
    Submitted(SubmitOutcome),
    AvailCheck(AvailCheckOutcome),
}

#[derive(Debug, Default)]
pub struct PageState {
    pub doc: Document,
    pub views: ViewSwitcher,
    pub bindings: Bindings,
    /// User issued by the backend, held from user registration until the
    /// stand-in step completes.
    pub session_user: Option<UserRef>,
    pub profile_user: Option<UserRef>,
    pub template: Option<String>,
    pub page_user: Option<UserId>,
}

impl PageState {
    pub fn require(&self, id: &str) -> Result<NodeId, FlowError> {
        self.doc
            .element_by_id(id)
            .ok_or_else(|| FlowError::missing(format!("#{id}")))
    }

    pub fn visible_views(&self) -> Vec<ViewId> {
        views::visible_views(&self.doc)
    }

    pub fn message_text(&self) -> String {
        views::message_text(&self.doc)
    }

    /// Frees nodes replaced by a render and drops their bindings.
    pub fn sweep(&mut self) {
        let freed = self.doc.sweep();
        self.bindings.prune(&self.doc);
        if freed > 0 {
            debug!(freed, "reclaimed detached nodes");
        }
    }
}

struct BusyGuard<'a> {
    flags: &'a StdMutex<HashSet<Flow>>,
    flow: Flow,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.flow);
    }
}

pub struct FlowController {
    backend: Arc<dyn CantinaBackend>,
    host: Arc<dyn Host>,
    settings: FlowSettings,
    page: Mutex<PageState>,
    busy: StdMutex<HashSet<Flow>>,
}

impl FlowController {
    pub fn new(
        backend: Arc<dyn CantinaBackend>,
        host: Arc<dyn Host>,
        settings: FlowSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            host,
            settings,
            page: Mutex::new(PageState::default()),
            busy: StdMutex::new(HashSet::new()),
        })
    }

    pub async fn page(&self) -> MutexGuard<'_, PageState> {
        self.page.lock().await
    }

    fn try_begin(&self, flow: Flow) -> Option<BusyGuard<'_>> {
        let mut flags = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        if !flags.insert(flow) {
            warn!(?flow, "submission ignored while previous one is in flight");
            return None;
        }
        Some(BusyGuard {
            flags: &self.busy,
            flow,
        })
    }

    pub fn is_busy(&self, flow: Flow) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&flow)
    }

    /// Fetches the landing page and sets up the initial view for its template.
    pub async fn open(&self) -> Result<(), FlowError> {
        let html = self.backend.fetch_page().await?;
        let (template, page_user) = {
            let mut guard = self.page.lock().await;
            let page = &mut *guard;
            *page = PageState {
                doc: Document::parse(&html),
                ..PageState::default()
            };

            let body = page.doc.elements_by_tag("body").first().copied();
            page.template = body
                .and_then(|body| page.doc.attr(body, "data-template"))
                .map(str::to_string);
            page.page_user = body
                .and_then(|body| page.doc.attr(body, "data-user"))
                .and_then(|raw| raw.trim().parse::<i64>().ok())
                .map(UserId);

            if admin::is_standin_admin_page(&page.doc) {
                if let Err(err) = admin::format_standin_admin(&mut page.doc) {
                    warn!(%err, "admin layout left unchanged");
                }
            }

            NavController::bind(&page.doc, &mut page.bindings);
            views::clear_messages(&mut page.doc);
            (page.template.clone(), page.page_user)
        };
        info!(template = ?template, user_id = ?page_user.map(|id| id.0), "page opened");

        match template.as_deref() {
            Some("home") => {
                self.show("home").await;
            }
            Some("index") => {
                self.show("index").await;
            }
            Some("standin") => {
                match page_user {
                    Some(user_id) => {
                        self.render_availchecks(user_id, &[ViewId::Standin, ViewId::Availchecks])
                            .await?
                    }
                    None => warn!("stand-in page without a user id"),
                }
                self.show("standin").await;
            }
            other => debug!(template = ?other, "no initial view for template"),
        }
        Ok(())
    }

    /// Full page reload.
    pub async fn reload(&self) -> Result<(), FlowError> {
        info!("reloading page");
        self.open().await
    }

    pub async fn show(&self, name: &str) -> Option<ViewId> {
        let mut guard = self.page.lock().await;
        let page = &mut *guard;
        page.views.show(&mut page.doc, name)
    }

    /// Delivers a click to `node`. Aborted actions are logged and returned.
    pub async fn click(&self, node: NodeId) -> Result<ClickOutcome, FlowError> {
        let action = {
            let page = self.page.lock().await;
            if !page.doc.is_rendered(node) {
                debug!(?node, "click on a stale or hidden element ignored");
                return Ok(ClickOutcome::Unbound);
            }
            page.bindings.action(node).cloned()
        };
        let Some(action) = action else {
            return Ok(ClickOutcome::Unbound);
        };

        let action_name = action.name();
        let outcome = self.dispatch(action).await;
        if let Err(err) = &outcome {
            error!(action = action_name, %err, "ui action aborted");
        }
        outcome
    }

    pub async fn click_id(&self, id: &str) -> Result<ClickOutcome, FlowError> {
        let node = self.page.lock().await.require(id)?;
        self.click(node).await
    }

    async fn dispatch(&self, action: UiAction) -> Result<ClickOutcome, FlowError> {
        match action {
            UiAction::Navigate(view) => Ok(ClickOutcome::Navigated(self.navigate(&view).await?)),
            UiAction::OpenLogin => {
                self.load_login().await?;
                Ok(ClickOutcome::Navigated(self.show("login").await))
            }
            UiAction::OpenRegister => {
                self.load_register_user().await?;
                Ok(ClickOutcome::Navigated(self.show("register_user").await))
            }
            UiAction::SubmitRegisterUser => {
                Ok(ClickOutcome::Submitted(self.submit_register_user().await?))
            }
            UiAction::SubmitRegisterStandin(user) => Ok(ClickOutcome::Submitted(
                self.submit_register_standin(user).await?,
            )),
            UiAction::SubmitLogin => Ok(ClickOutcome::Submitted(self.submit_login().await?)),
            UiAction::SubmitProfile => Ok(ClickOutcome::Submitted(self.submit_profile().await?)),
            UiAction::AcceptAvailCheck(id) => {
                Ok(ClickOutcome::AvailCheck(self.accept_availcheck(id).await?))
            }
            UiAction::RejectAvailCheck(id) => {
                Ok(ClickOutcome::AvailCheck(self.reject_availcheck(id).await))
            }
        }
    }

    /// Runs the loader for `view`, then switches to it.
    pub async fn navigate(&self, view: &str) -> Result<Option<ViewId>, FlowError> {
        match view {
            "home" => self.load_home().await,
            "register_user" => self.load_register_user().await?,
            "register_standin" => {
                let user = self.page.lock().await.session_user.clone();
                match user {
                    Some(user) => self.load_register_standin(user).await?,
                    None => warn!("stand-in registration needs a registered user first"),
                }
            }
            "login" => self.load_login().await?,
            "user_account" => self.load_user_account().await,
            "standin_profile" => self.load_standin_profile().await?,
            "availchecks" => {
                let user = self.page.lock().await.page_user;
                match user {
                    Some(user_id) => self.load_availchecks(user_id).await?,
                    None => warn!("availability checks need a stand-in user"),
                }
            }
            _ => {}
        }
        Ok(self.show(view).await)
    }

    pub async fn load_home(&self) {
        let mut guard = self.page.lock().await;
        let page = &mut *guard;
        views::clear_messages(&mut page.doc);
        views::set_heading(&mut page.doc, "");
        page.views.show_view(&mut page.doc, ViewId::Home);
    }

    pub async fn load_user_account(&self) {
        let mut page = self.page.lock().await;
        views::set_heading(&mut page.doc, "User Account");
    }

    /// Sets the value of the control called `name` inside `view`'s container.
    pub async fn fill_in(&self, view: ViewId, name: &str, value: &str) -> Result<(), FlowError> {
        let mut page = self.page.lock().await;
        let control = control_in(&page.doc, view, name)?;
        page.doc.set_value(control, value);
        Ok(())
    }

    pub async fn set_checked_in(
        &self,
        view: ViewId,
        name: &str,
        checked: bool,
    ) -> Result<(), FlowError> {
        let mut page = self.page.lock().await;
        let control = control_in(&page.doc, view, name)?;
        page.doc.set_checked(control, checked);
        Ok(())
    }
}

fn control_in(doc: &Document, view: ViewId, name: &str) -> Result<NodeId, FlowError> {
    let container = views::view_container(doc, view)
        .ok_or_else(|| FlowError::missing(format!("#{}", view.container_id())))?;
    doc.element_by_name(container, name)
        .ok_or_else(|| FlowError::missing(format!("[name={name}] in {view}")))
}

#[cfg(test)]
#[path = "../tests/flows_tests.rs"]
mod tests;
