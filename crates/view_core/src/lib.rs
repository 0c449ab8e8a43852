//! Headless view layer of the StandIn Cantina site.
//!
//! The page is held as a [`dom::Document`]; panels are switched by
//! [`views::ViewSwitcher`], fetched form fragments are decorated by
//! [`enhance`], and every click is routed through the binding table that
//! [`nav::NavController`] and the flow loaders fill in.

pub mod admin;
pub mod dom;
pub mod enhance;
pub mod error;
pub mod flows;
pub mod host;
pub mod nav;
pub mod views;

pub use dom::{Document, NodeId};
pub use error::FlowError;
pub use flows::{
    AvailCheckOutcome, ClickOutcome, Flow, FlowController, FlowSettings, PageState, SubmitOutcome,
};
pub use host::{AutoConfirm, Host};
pub use nav::{Bindings, NavController, UiAction};
pub use views::ViewSwitcher;
