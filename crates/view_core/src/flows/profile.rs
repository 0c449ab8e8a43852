use shared::domain::ViewId;
use tracing::{debug, error, info};

use super::{Flow, FlowController, SubmitOutcome};
use crate::{error::FlowError, nav::UiAction, views};

const PROFILE_FORM_ID: &str = "updateProfile_form";
const PROFILE_PLACEHOLDER_ID: &str = "standinForm";
const DELETE_PICTURE_ID: &str = "id_delete_profile_pic";

const PROFILE_TEMPLATE: &str = r#"
<form id="updateProfile_form">
    <div class="form-group col-md-5">
        <div id="standinForm"></div>
    </div>
    <input id="updateProfile_btn" class="btn btn-primary" type="submit" value="Update">
</form>"#;

impl FlowController {
    /// Shows the profile view first and fills it once the form arrives.
    pub async fn load_standin_profile(&self) -> Result<(), FlowError> {
        debug!("loading stand-in profile");
        {
            let mut guard = self.page.lock().await;
            let page = &mut *guard;
            views::set_heading(&mut page.doc, "Stand-in Profile");
            let view = page.require(&ViewId::StandinProfile.container_id())?;
            page.doc.set_inner_html(view, PROFILE_TEMPLATE);
            page.sweep();
            let button = page.require("updateProfile_btn")?;
            page.bindings.bind(button, UiAction::SubmitProfile);
            page.views.show_view(&mut page.doc, ViewId::StandinProfile);
        }

        let profile = match self.backend.profile().await {
            Ok(profile) => profile,
            Err(err) => {
                error!(%err, "error loading profile");
                return Ok(());
            }
        };

        let mut guard = self.page.lock().await;
        let page = &mut *guard;
        page.profile_user = profile.user;
        let placeholder = page.require(PROFILE_PLACEHOLDER_ID)?;
        page.doc.set_inner_html(placeholder, &profile.profile_form);
        if let Some(checkbox) = page.doc.element_by_id(DELETE_PICTURE_ID) {
            if let Some(wrapper) = page.doc.parent(checkbox) {
                page.doc.add_class(wrapper, "checkBox_div");
            }
        }
        Ok(())
    }

    /// Posts the profile form. The view stays where it is either way.
    pub async fn submit_profile(&self) -> Result<SubmitOutcome, FlowError> {
        let Some(_busy) = self.try_begin(Flow::Profile) else {
            return Ok(SubmitOutcome::Busy);
        };

        let form_data = {
            let page = self.page.lock().await;
            let form = page.require(PROFILE_FORM_ID)?;
            page.doc.form_data(form)
        };

        let result = match self.backend.update_profile(&form_data).await {
            Ok(result) => result,
            Err(err) => {
                error!(%err, "error updating profile");
                return Ok(SubmitOutcome::Failed);
            }
        };
        info!(status = result.status.as_str(), "profile update answered");

        let mut page = self.page.lock().await;
        if views::message_region(&page.doc).is_none() {
            return Err(FlowError::missing("message region"));
        }
        if result.is_success() {
            views::show_message(&mut page.doc, &result.message, Some(result.status));
            return Ok(SubmitOutcome::Accepted);
        }
        let summary: String = result.errors.first_errors().collect();
        views::show_message(&mut page.doc, &summary, Some(result.status));
        Ok(SubmitOutcome::Rejected)
    }
}
