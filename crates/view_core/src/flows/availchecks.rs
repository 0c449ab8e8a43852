//! Pending availability checks of a stand-in.

use shared::domain::{AvailCheckId, UserId, ViewId};
use tracing::{debug, error, info, warn};

use super::{Flow, FlowController};
use crate::{dom::Document, error::FlowError, nav::UiAction, views};

const LIST_CONTAINER_CLASS: &str = "avail_checks_div";
const ACCEPT_PROMPT: &str = "Accept Avail Check?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailCheckOutcome {
    Accepted,
    /// The user said no at the confirmation prompt.
    Declined,
    Busy,
    Failed,
    /// Rejecting has no backend behaviour yet.
    Unsupported,
}

pub fn accept_button_id(id: AvailCheckId) -> String {
    format!("accept_{id}")
}

pub fn reject_button_id(id: AvailCheckId) -> String {
    format!("reject_{id}")
}

fn button(doc: &mut Document, id: &str, class: &str, label: &str) -> crate::dom::NodeId {
    let node = doc.create_element("button");
    doc.set_attr(node, "id", id);
    doc.set_attr(node, "class", format!("btn {class}"));
    doc.set_text(node, label);
    node
}

impl FlowController {
    /// Lists the user's pending checks with accept and reject controls, then
    /// shows the availability-check views.
    pub async fn load_availchecks(&self, user_id: UserId) -> Result<(), FlowError> {
        self.render_availchecks(user_id, &[ViewId::Availchecks, ViewId::Standin])
            .await?;
        let mut guard = self.page.lock().await;
        let page = &mut *guard;
        page.views.show_view(&mut page.doc, ViewId::Availchecks);
        Ok(())
    }

    /// Renders the list into the first of `targets` present on the page,
    /// replacing any list rendered earlier.
    pub(super) async fn render_availchecks(
        &self,
        user_id: UserId,
        targets: &[ViewId],
    ) -> Result<(), FlowError> {
        let records = match self.backend.availchecks(user_id).await {
            Ok(records) => records,
            Err(err) => {
                error!(%user_id, %err, "error loading availability checks");
                return Ok(());
            }
        };
        debug!(%user_id, count = records.len(), "availability checks loaded");

        let rendered: Vec<AvailCheckId> = {
            let mut guard = self.page.lock().await;
            let page = &mut *guard;
            let container = targets
                .iter()
                .find_map(|view| views::view_container(&page.doc, *view))
                .ok_or_else(|| {
                    let wanted = targets.first().copied().unwrap_or(ViewId::Availchecks);
                    FlowError::missing(format!("#{}", wanted.container_id()))
                })?;
            for stale in page.doc.elements_by_class(LIST_CONTAINER_CLASS) {
                page.doc.detach(stale);
            }
            page.sweep();
            let doc = &mut page.doc;

            let list_div = doc.create_element("div");
            doc.set_attr(list_div, "class", format!("{LIST_CONTAINER_CLASS} container"));
            let list = doc.create_element("ul");
            doc.set_attr(list, "class", "avail_checks_ul");
            doc.set_attr(list, "id", "avail_checks_ul");
            doc.append_child(list_div, list);

            for record in &records {
                let item = doc.create_element("li");
                doc.set_attr(item, "class", "avail_check_li");
                doc.set_attr(item, "id", format!("avail_check_li_{}", record.list_key()));
                let summary = doc.create_element("span");
                doc.set_text(summary, &record.summary());
                doc.append_child(item, summary);

                let accept = button(doc, &accept_button_id(record.id), "accept_btn", "Accept");
                let reject = button(doc, &reject_button_id(record.id), "reject_btn", "Reject");
                doc.append_child(item, accept);
                doc.append_child(item, reject);
                doc.append_child(list, item);

                if !self.settings.eager_availcheck_listeners {
                    page.bindings.bind(accept, UiAction::AcceptAvailCheck(record.id));
                    page.bindings.bind(reject, UiAction::RejectAvailCheck(record.id));
                }
            }
            doc.append_child(container, list_div);
            records.iter().map(|record| record.id).collect()
        };

        if self.settings.eager_availcheck_listeners {
            warn!(
                count = rendered.len(),
                "running availability-check handlers at render time"
            );
            for id in rendered {
                self.accept_availcheck(id).await?;
                self.reject_availcheck(id).await;
            }
        }
        Ok(())
    }

    /// Confirms, then asks the backend to accept and disables the control.
    pub async fn accept_availcheck(&self, id: AvailCheckId) -> Result<AvailCheckOutcome, FlowError> {
        if !self.host.confirm(ACCEPT_PROMPT) {
            debug!(avail_check_id = %id, "accept declined");
            return Ok(AvailCheckOutcome::Declined);
        }
        let Some(_busy) = self.try_begin(Flow::AcceptAvailCheck) else {
            return Ok(AvailCheckOutcome::Busy);
        };

        let data = match self.backend.accept_availcheck(id).await {
            Ok(data) => data,
            Err(err) => {
                error!(avail_check_id = %id, %err, "error accepting availability check");
                return Ok(AvailCheckOutcome::Failed);
            }
        };
        info!(avail_check_id = %id, response = %data, "availability check accepted");

        let mut page = self.page.lock().await;
        let button = page.require(&accept_button_id(id))?;
        page.doc.add_class(button, "disabled");
        page.doc.set_attr(button, "disabled", "");
        Ok(AvailCheckOutcome::Accepted)
    }

    /// Rejecting is not defined by the backend yet; nothing is sent.
    pub async fn reject_availcheck(&self, id: AvailCheckId) -> AvailCheckOutcome {
        warn!(avail_check_id = %id, "rejecting availability checks is not supported");
        AvailCheckOutcome::Unsupported
    }
}
