//! Named view switching and the shared message region.

use shared::{domain::ViewId, protocol::ActionStatus};
use tracing::{debug, warn};

use crate::dom::{Document, NodeId};

pub const VIEW_CLASS: &str = "view";
pub const MESSAGE_ID: &str = "message";
pub const MESSAGE_CLASS: &str = "message";
pub const HEADING_ID: &str = "pHeading";

const STATUS_CLASSES: [ActionStatus; 2] = [ActionStatus::Success, ActionStatus::Error];

/// Tracks the last requested view. Visibility is always recomputed from scratch.
#[derive(Debug, Default)]
pub struct ViewSwitcher {
    current: Option<ViewId>,
}

impl ViewSwitcher {
    pub fn current(&self) -> Option<ViewId> {
        self.current
    }

    /// Shows the view called `name`. Unknown names are logged and change nothing.
    pub fn show(&mut self, doc: &mut Document, name: &str) -> Option<ViewId> {
        match name.parse::<ViewId>() {
            Ok(view) => {
                self.show_view(doc, view);
                Some(view)
            }
            Err(err) => {
                warn!(%err, "view switch ignored");
                None
            }
        }
    }

    pub fn show_view(&mut self, doc: &mut Document, view: ViewId) {
        debug!(%view, "switching view");
        for container in doc.elements_by_class(VIEW_CLASS) {
            doc.set_displayed(container, false);
        }
        clear_messages(doc);

        for target in std::iter::once(view).chain(view.companions().iter().copied()) {
            match doc.element_by_id(&target.container_id()) {
                Some(container) => doc.set_displayed(container, true),
                None => debug!(view = %target, "no container for view"),
            }
        }
        self.current = Some(view);
    }
}

/// Views whose containers are currently displayed, in document order.
pub fn visible_views(doc: &Document) -> Vec<ViewId> {
    doc.elements_by_class(VIEW_CLASS)
        .into_iter()
        .filter(|container| doc.is_displayed(*container))
        .filter_map(|container| {
            doc.attr(container, "id")?
                .strip_suffix("-view")?
                .parse::<ViewId>()
                .ok()
        })
        .collect()
}

pub fn view_container(doc: &Document, view: ViewId) -> Option<NodeId> {
    doc.element_by_id(&view.container_id())
}

pub fn message_region(doc: &Document) -> Option<NodeId> {
    doc.element_by_id(MESSAGE_ID)
        .or_else(|| doc.elements_by_class(MESSAGE_CLASS).first().copied())
}

pub fn clear_messages(doc: &mut Document) {
    if let Some(region) = message_region(doc) {
        doc.clear_children(region);
    }
}

/// Replaces the message text and its status class. `None` leaves the region unstyled.
pub fn show_message(doc: &mut Document, text: &str, status: Option<ActionStatus>) -> bool {
    let Some(region) = message_region(doc) else {
        warn!("page has no message region");
        return false;
    };
    doc.set_text(region, text);
    for other in STATUS_CLASSES {
        doc.remove_class(region, other.message_class());
    }
    if let Some(status) = status {
        doc.add_class(region, status.message_class());
    }
    true
}

/// Appends `<p>text</p>` to the message region.
pub fn append_message_line(doc: &mut Document, text: &str) -> bool {
    let Some(region) = message_region(doc) else {
        warn!("page has no message region");
        return false;
    };
    let line = doc.create_element("p");
    doc.set_text(line, text);
    doc.append_child(region, line);
    true
}

pub fn message_text(doc: &Document) -> String {
    message_region(doc)
        .map(|region| doc.text_content(region))
        .unwrap_or_default()
}

pub fn set_heading(doc: &mut Document, text: &str) {
    match doc.element_by_id(HEADING_ID) {
        Some(heading) => doc.set_text(heading, text),
        None => debug!(heading = text, "page has no heading element"),
    }
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;
