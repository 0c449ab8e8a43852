use client_core::LoginResponse;
use shared::domain::ViewId;
use tracing::{debug, error, info};

use super::{Flow, FlowController, SubmitOutcome};
use crate::{error::FlowError, nav::UiAction, views};

const LOGIN_FORM_ID: &str = "login_form";

const LOGIN_TEMPLATE: &str = r#"
<form id="login_form">
    <div class="form-group">
        <input class="form-control" type="text" name="username" placeholder="Username" autofocus autocomplete="username">
    </div>
    <div class="form-group">
        <input class="form-control" type="password" name="password" placeholder="Password" autocomplete="current-password">
    </div>
    <input id="login_btn" class="btn btn-primary" type="submit" value="Login">
</form>
Don't have an account? <a id="register_link" class="register" href="">Register here.</a>"#;

impl FlowController {
    /// Renders the login form locally; nothing is fetched.
    pub async fn load_login(&self) -> Result<(), FlowError> {
        debug!("loading login");
        let mut guard = self.page.lock().await;
        let page = &mut *guard;
        views::set_heading(&mut page.doc, "Login");
        let view = page.require(&ViewId::Login.container_id())?;
        page.doc.set_inner_html(view, LOGIN_TEMPLATE);
        page.sweep();

        let button = page.require("login_btn")?;
        page.bindings.bind(button, UiAction::SubmitLogin);
        let register_link = page.require("register_link")?;
        page.bindings.bind(register_link, UiAction::OpenRegister);
        Ok(())
    }

    /// Posts the credentials. An HTML answer means the server already rendered
    /// the signed-in page and the client reloads.
    pub async fn submit_login(&self) -> Result<SubmitOutcome, FlowError> {
        let Some(_busy) = self.try_begin(Flow::Login) else {
            return Ok(SubmitOutcome::Busy);
        };

        let form_data = {
            let page = self.page.lock().await;
            let form = page.require(LOGIN_FORM_ID)?;
            page.doc.form_data(form)
        };

        match self.backend.login(&form_data).await {
            Ok(LoginResponse::Authenticated(_)) => {
                info!("login accepted");
                self.reload().await?;
                Ok(SubmitOutcome::Reloaded)
            }
            Ok(LoginResponse::Result(result)) => {
                info!(status = result.status.as_str(), reply = %result.message, "login answered");
                let mut page = self.page.lock().await;
                if views::message_region(&page.doc).is_none() {
                    return Err(FlowError::missing("message region"));
                }
                views::show_message(&mut page.doc, &result.message, None);
                if result.is_success() {
                    return Ok(SubmitOutcome::Accepted);
                }
                for (_, message) in result.errors.iter_all() {
                    views::append_message_line(&mut page.doc, message);
                }
                Ok(SubmitOutcome::Rejected)
            }
            Err(err) => {
                error!(%err, "error logging in");
                let mut page = self.page.lock().await;
                views::append_message_line(&mut page.doc, "Error logging in");
                Ok(SubmitOutcome::Failed)
            }
        }
    }
}
