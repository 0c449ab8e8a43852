//! Click bindings for navigation links and form controls.

use std::collections::HashMap;

use shared::domain::{AvailCheckId, UserRef};
use tracing::debug;

use crate::dom::{Document, NodeId};

pub const NAV_LINK_CLASS: &str = "nav-link";
pub const LOGOUT_VIEW: &str = "logout";

/// What a click on a bound element does.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Navigate(String),
    OpenLogin,
    OpenRegister,
    SubmitRegisterUser,
    SubmitRegisterStandin(UserRef),
    SubmitLogin,
    SubmitProfile,
    AcceptAvailCheck(AvailCheckId),
    RejectAvailCheck(AvailCheckId),
}

impl UiAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Navigate(_) => "navigate",
            Self::OpenLogin => "open_login",
            Self::OpenRegister => "open_register",
            Self::SubmitRegisterUser => "submit_register_user",
            Self::SubmitRegisterStandin(_) => "submit_register_standin",
            Self::SubmitLogin => "submit_login",
            Self::SubmitProfile => "submit_profile",
            Self::AcceptAvailCheck(_) => "accept_availcheck",
            Self::RejectAvailCheck(_) => "reject_availcheck",
        }
    }
}

/// One action per node; binding a node again replaces its action.
#[derive(Debug, Default)]
pub struct Bindings {
    actions: HashMap<NodeId, UiAction>,
}

impl Bindings {
    pub fn bind(&mut self, node: NodeId, action: UiAction) {
        self.actions.insert(node, action);
    }

    pub fn action(&self, node: NodeId) -> Option<&UiAction> {
        self.actions.get(&node)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Drops bindings of nodes no longer in the document.
    pub fn prune(&mut self, doc: &Document) {
        self.actions.retain(|node, _| doc.is_connected(*node));
    }
}

pub struct NavController;

impl NavController {
    /// Binds every nav link except logout, which keeps its native navigation.
    /// Returns the number of links bound.
    pub fn bind(doc: &Document, bindings: &mut Bindings) -> usize {
        let mut bound = 0;
        for link in doc.elements_by_class(NAV_LINK_CLASS) {
            let Some(view) = doc.attr(link, "data-view") else {
                continue;
            };
            if view == LOGOUT_VIEW {
                continue;
            }
            bindings.bind(link, UiAction::Navigate(view.to_string()));
            bound += 1;
        }
        debug!(bound, "bound navigation links");
        bound
    }
}
