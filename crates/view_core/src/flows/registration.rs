//! `register_user -> register_standin -> registration_pending`.

use shared::{
    domain::{UserRef, ViewId},
    protocol::{ActionResult, StandinRegFormResponse},
};
use tracing::{debug, error, info, warn};

use super::{Flow, FlowController, SubmitOutcome};
use crate::{
    enhance,
    error::FlowError,
    nav::UiAction,
    views,
};

const USER_FORM_ID: &str = "userRegistration_form";
const USER_SUBMIT_ID: &str = "regUser_btn";
const STANDIN_FORM_ID: &str = "standInRegistration_form";
const STANDIN_SUBMIT_ID: &str = "regStandIn_btn";

const USER_REGISTRATION_TEMPLATE: &str = r#"
<div class="form-view">
    <form>
        <div id="userRegistration_form" class="col-md-5"></div>
        <button id="regUser_btn" type="submit">Next</button>
    </form>
    Already have an account? <a id="login_link" class="login" data-view="login" href="">Log In here.</a>
</div>"#;

const STANDIN_REGISTRATION_TEMPLATE: &str = r#"
<form>
    <div class="form-group col-md-5">
        <div id="standInRegistration_form"></div>
    </div>
    <button id="regStandIn_btn" type="submit">Submit</button>
</form>"#;

fn log_field_errors<E>(result: &ActionResult<E>) {
    for (field, message) in result.errors.iter_all() {
        warn!(field, error = message, "form field rejected");
    }
}

impl FlowController {
    pub async fn load_register_user(&self) -> Result<(), FlowError> {
        debug!("loading user registration");
        {
            let mut guard = self.page.lock().await;
            let page = &mut *guard;
            views::clear_messages(&mut page.doc);
            views::set_heading(&mut page.doc, "User registration");
            let view = page.require(&ViewId::RegisterUser.container_id())?;
            page.doc.set_inner_html(view, USER_REGISTRATION_TEMPLATE);
            page.sweep();
            let login_link = page.require("login_link")?;
            page.bindings.bind(login_link, UiAction::OpenLogin);
            page.session_user = None;
        }

        let fragment = match self.backend.register_user_form().await {
            Ok(payload) => Some(payload.user_reg_form),
            Err(err) => {
                error!(%err, "error loading user registration form");
                None
            }
        };

        let mut guard = self.page.lock().await;
        let page = &mut *guard;
        let placeholder = page.require(USER_FORM_ID)?;
        if let Some(fragment) = fragment {
            page.doc.set_inner_html(placeholder, &fragment);
        }
        enhance::decorate(&mut page.doc, placeholder);
        enhance::relocate_standin_checkbox(&mut page.doc, placeholder);

        let button = page.require(USER_SUBMIT_ID)?;
        page.doc.add_class(button, "btn");
        page.doc.add_class(button, "btn-primary");
        page.bindings.bind(button, UiAction::SubmitRegisterUser);
        Ok(())
    }

    /// Validates and posts the user form, then branches on the `is_standin` box.
    pub async fn submit_register_user(&self) -> Result<SubmitOutcome, FlowError> {
        let Some(_busy) = self.try_begin(Flow::RegisterUser) else {
            return Ok(SubmitOutcome::Busy);
        };

        let (form_data, is_standin) = {
            let page = self.page.lock().await;
            let placeholder = page.require(USER_FORM_ID)?;
            let form = page
                .doc
                .parent(placeholder)
                .ok_or_else(|| FlowError::missing("user registration form"))?;
            let missing = page.doc.missing_required(form);
            if !missing.is_empty() {
                info!(?missing, "user registration form incomplete");
                return Ok(SubmitOutcome::Invalid(missing));
            }
            let is_standin = page
                .doc
                .element_by_name(form, enhance::STANDIN_FIELD)
                .is_some_and(|checkbox| page.doc.is_checked(checkbox));
            (page.doc.form_data(form), is_standin)
        };

        let result = match self.backend.submit_register_user(&form_data).await {
            Ok(result) => result,
            Err(err) => {
                error!(%err, "error registering user");
                return Ok(SubmitOutcome::Failed);
            }
        };
        info!(status = result.status.as_str(), reply = %result.message, "user registration answered");
        {
            let mut page = self.page.lock().await;
            views::show_message(&mut page.doc, &result.message, Some(result.status));
        }

        if !result.is_success() {
            log_field_errors(&result);
            return Ok(SubmitOutcome::Rejected);
        }

        if is_standin {
            let user = result
                .entity
                .ok_or(FlowError::MissingUser("stand-in registration"))?;
            self.page.lock().await.session_user = Some(user.clone());
            self.load_register_standin(user).await?;
        } else {
            self.load_reg_pending().await;
        }
        Ok(SubmitOutcome::Accepted)
    }

    /// Loads the stand-in form for `user`. A failed fetch leaves the form empty.
    pub async fn load_register_standin(&self, user: UserRef) -> Result<(), FlowError> {
        debug!(user_id = %user.id, "loading stand-in registration");
        {
            let mut guard = self.page.lock().await;
            let page = &mut *guard;
            views::set_heading(&mut page.doc, "Stand-in registration");
            let view = page.require(&ViewId::RegisterStandin.container_id())?;
            page.doc.set_inner_html(view, STANDIN_REGISTRATION_TEMPLATE);
            page.sweep();
        }

        let fragment = match self.backend.register_standin_form(user.id).await {
            Ok(StandinRegFormResponse {
                standin_reg_form: Some(fragment),
            }) => Some(fragment),
            Ok(_) => {
                error!(user_id = %user.id, "standin_reg_form is missing in response");
                None
            }
            Err(err) => {
                error!(user_id = %user.id, %err, "error loading stand-in registration form");
                None
            }
        };

        let mut guard = self.page.lock().await;
        let page = &mut *guard;
        let placeholder = page.require(STANDIN_FORM_ID)?;
        if let Some(fragment) = fragment {
            page.doc.set_inner_html(placeholder, &fragment);
        }
        enhance::decorate(&mut page.doc, placeholder);

        match page.doc.element_by_id(STANDIN_SUBMIT_ID) {
            Some(button) => {
                page.doc.add_class(button, "btn");
                page.bindings
                    .bind(button, UiAction::SubmitRegisterStandin(user));
            }
            None => error!("{STANDIN_SUBMIT_ID} not found"),
        }
        page.views.show_view(&mut page.doc, ViewId::RegisterStandin);
        Ok(())
    }

    pub async fn submit_register_standin(&self, user: UserRef) -> Result<SubmitOutcome, FlowError> {
        let Some(_busy) = self.try_begin(Flow::RegisterStandin) else {
            return Ok(SubmitOutcome::Busy);
        };

        let form_data = {
            let page = self.page.lock().await;
            let placeholder = page.require(STANDIN_FORM_ID)?;
            let form = page
                .doc
                .parent(placeholder)
                .and_then(|group| page.doc.parent(group))
                .ok_or_else(|| FlowError::missing("stand-in registration form"))?;
            page.doc.form_data(form)
        };

        let result = match self
            .backend
            .submit_register_standin(user.id, &form_data)
            .await
        {
            Ok(result) => result,
            Err(err) => {
                error!(user_id = %user.id, %err, "error registering stand-in");
                return Ok(SubmitOutcome::Failed);
            }
        };
        info!(status = result.status.as_str(), reply = %result.message, "stand-in registration answered");
        {
            let mut page = self.page.lock().await;
            views::show_message(&mut page.doc, &result.message, Some(result.status));
        }

        if !result.is_success() {
            log_field_errors(&result);
            return Ok(SubmitOutcome::Rejected);
        }
        self.page.lock().await.session_user = None;
        self.load_reg_pending().await;
        Ok(SubmitOutcome::Accepted)
    }

    pub async fn load_reg_pending(&self) {
        let mut guard = self.page.lock().await;
        let page = &mut *guard;
        views::set_heading(&mut page.doc, "Registration pending");
        page.views
            .show_view(&mut page.doc, ViewId::RegistrationPending);
    }
}
