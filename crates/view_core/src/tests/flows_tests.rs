use super::*;
use async_trait::async_trait;
use client_core::{ClientError, FormData, LoginResponse, Result as ClientResult};
use serde_json::{json, Value};
use shared::{
    domain::AvailCheckId,
    protocol::{
        ActionResult, AvailCheckRecord, ProfileResponse, StandinRegFormResponse,
        UserRegFormResponse,
    },
};
use tokio::sync::Notify;

use crate::host::AutoConfirm;

const USER_FORM: &str = r#"<div><label for="id_username">Username:</label><input type="text" name="username" maxlength="150" required id="id_username"></div>
<div><label for="id_password1">Password:</label><input type="password" name="password1" required id="id_password1"></div>
<div><label for="id_is_standin">Stand-in:</label><input type="checkbox" name="is_standin" id="id_is_standin"><span class="helptext">Tick if you are a stand-in.</span></div>"#;

const STANDIN_FORM: &str = r#"<div><label for="id_phone">Phone:</label><input type="tel" name="phone" id="id_phone"></div>"#;

const PROFILE_FORM: &str = r#"<p><label for="id_bio">Bio:</label><textarea name="bio" id="id_bio">hi</textarea></p>
<p><input type="checkbox" name="delete_profile_pic" id="id_delete_profile_pic"><label for="id_delete_profile_pic">Delete picture</label></p>"#;

fn page_html(template: &str, user: Option<i64>) -> String {
    let user = user.map(|id| format!(r#" data-user="{id}""#)).unwrap_or_default();
    let views: String = ViewId::ALL
        .iter()
        .map(|view| format!(r#"<div id="{}" class="view"></div>"#, view.container_id()))
        .collect();
    format!(
        r#"<!DOCTYPE html><html><head><title>StandIn Cantina</title></head>
<body data-template="{template}"{user}>
<nav>
<a class="nav-link" data-view="home" href="/">Home</a>
<a class="nav-link" data-view="register_user" href="">Register</a>
<a class="nav-link" data-view="login" href="">Login</a>
<a class="nav-link" data-view="standin_profile" href="">Profile</a>
<a id="logout_link" class="nav-link" data-view="logout" href="/logout">Logout</a>
</nav>
<h1 id="pHeading"></h1>
<div id="message" class="message"></div>
{views}
</body></html>"#
    )
}

enum LoginScript {
    Page,
    Json(Value),
    Fail,
}

struct LoginGate {
    entered: Notify,
    release: Notify,
}

struct FakeBackend {
    page: String,
    register_user: Value,
    standin_form: Option<Option<String>>,
    register_standin: Value,
    login: LoginScript,
    login_gate: Option<Arc<LoginGate>>,
    update_profile: Value,
    availchecks: Option<Vec<Value>>,
    calls: StdMutex<Vec<String>>,
    posted: StdMutex<Vec<(String, FormData)>>,
}

impl FakeBackend {
    fn new(template: &str) -> Self {
        Self {
            page: page_html(template, None),
            register_user: json!({
                "user": {"id": 7, "username": "alice"},
                "status": "success",
                "message": "User created successfully"
            }),
            standin_form: Some(Some(STANDIN_FORM.to_string())),
            register_standin: json!({"status": "success", "message": "Stand-in registered"}),
            login: LoginScript::Page,
            login_gate: None,
            update_profile: json!({"status": "success", "message": "Profile updated"}),
            availchecks: Some(Vec::new()),
            calls: StdMutex::new(Vec::new()),
            posted: StdMutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn posted(&self, path: &str) -> Option<FormData> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, form)| form.clone())
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn record_post(&self, path: &str, form: &FormData) {
        self.record(path.to_string());
        self.posted
            .lock()
            .unwrap()
            .push((path.to_string(), form.clone()));
    }
}

fn unavailable(path: &str) -> ClientError {
    ClientError::Status {
        method: "GET",
        path: path.to_string(),
        status: 503,
    }
}

fn decode<T: serde::de::DeserializeOwned>(path: &str, value: &Value) -> ClientResult<T> {
    serde_json::from_value(value.clone()).map_err(|source| ClientError::Decode {
        path: path.to_string(),
        source,
    })
}

#[async_trait]
impl CantinaBackend for FakeBackend {
    async fn fetch_page(&self) -> ClientResult<String> {
        self.record("fetch_page".into());
        Ok(self.page.clone())
    }

    async fn register_user_form(&self) -> ClientResult<UserRegFormResponse> {
        self.record("register_user_form".into());
        Ok(UserRegFormResponse {
            user_reg_form: USER_FORM.to_string(),
        })
    }

    async fn submit_register_user(&self, form: &FormData) -> ClientResult<ActionResult<UserRef>> {
        self.record_post("register_user", form);
        decode("register_user", &self.register_user)
    }

    async fn register_standin_form(&self, user_id: UserId) -> ClientResult<StandinRegFormResponse> {
        self.record(format!("register_standin_form:{user_id}"));
        match &self.standin_form {
            Some(fragment) => Ok(StandinRegFormResponse {
                standin_reg_form: fragment.clone(),
            }),
            None => Err(unavailable("register_standin")),
        }
    }

    async fn submit_register_standin(
        &self,
        user_id: UserId,
        form: &FormData,
    ) -> ClientResult<ActionResult> {
        self.record_post(&format!("register_standin:{user_id}"), form);
        decode("register_standin", &self.register_standin)
    }

    async fn login(&self, form: &FormData) -> ClientResult<LoginResponse> {
        self.record_post("login", form);
        if let Some(gate) = &self.login_gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        match &self.login {
            LoginScript::Page => Ok(LoginResponse::Authenticated(self.page.clone())),
            LoginScript::Json(value) => Ok(LoginResponse::Result(decode("login", value)?)),
            LoginScript::Fail => Err(unavailable("login")),
        }
    }

    async fn profile(&self) -> ClientResult<ProfileResponse> {
        self.record("profile".into());
        Ok(ProfileResponse {
            user: Some(UserRef::new(7)),
            profile_form: PROFILE_FORM.to_string(),
        })
    }

    async fn update_profile(&self, form: &FormData) -> ClientResult<ActionResult> {
        self.record_post("profile", form);
        decode("profile", &self.update_profile)
    }

    async fn availchecks(&self, user_id: UserId) -> ClientResult<Vec<AvailCheckRecord>> {
        self.record(format!("availchecks:{user_id}"));
        match &self.availchecks {
            Some(records) => decode("load_availchecks", &Value::Array(records.clone())),
            None => Err(unavailable("load_availchecks")),
        }
    }

    async fn accept_availcheck(&self, id: AvailCheckId) -> ClientResult<Value> {
        self.record(format!("accept_availcheck:{id}"));
        Ok(json!({"status": "success", "id": id}))
    }
}

fn flow_controller(backend: &Arc<FakeBackend>, confirm: bool) -> Arc<FlowController> {
    controller_with(backend, confirm, FlowSettings::default())
}

fn controller_with(
    backend: &Arc<FakeBackend>,
    confirm: bool,
    settings: FlowSettings,
) -> Arc<FlowController> {
    FlowController::new(backend.clone(), Arc::new(AutoConfirm(confirm)), settings)
}

async fn visible(controller: &FlowController) -> Vec<ViewId> {
    controller.page().await.visible_views()
}

async fn fill_user_form(controller: &FlowController, is_standin: bool) {
    controller
        .fill_in(ViewId::RegisterUser, "username", "alice")
        .await
        .unwrap();
    controller
        .fill_in(ViewId::RegisterUser, "password1", "s3cret-pass")
        .await
        .unwrap();
    controller
        .set_checked_in(ViewId::RegisterUser, "is_standin", is_standin)
        .await
        .unwrap();
}

#[tokio::test]
async fn open_home_binds_nav_and_shows_home() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();

    assert_eq!(visible(&controller).await, vec![ViewId::Home]);
    let mut page = controller.page().await;
    assert_eq!(page.template.as_deref(), Some("home"));
    assert_eq!(page.bindings.len(), 4);

    let logout = page.require("logout_link").unwrap();
    assert_eq!(page.bindings.action(logout), None);

    let state = &mut *page;
    assert_eq!(NavController::bind(&state.doc, &mut state.bindings), 4);
    assert_eq!(state.bindings.len(), 4);
}

#[tokio::test]
async fn open_index_and_unknown_templates() {
    let backend = Arc::new(FakeBackend::new("index"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    assert_eq!(visible(&controller).await, vec![ViewId::Index]);

    let backend = Arc::new(FakeBackend::new("bookings_overview"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    assert_eq!(visible(&controller).await.len(), ViewId::ALL.len());
}

#[tokio::test]
async fn logout_click_is_left_to_the_browser() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();

    let outcome = controller.click_id("logout_link").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Unbound);
    assert_eq!(visible(&controller).await, vec![ViewId::Home]);
}

#[tokio::test]
async fn nav_link_runs_loader_then_switches() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();

    let login_link = {
        let page = controller.page().await;
        page.doc
            .elements_by_class("nav-link")
            .into_iter()
            .find(|link| page.doc.attr(*link, "data-view") == Some("login"))
            .unwrap()
    };
    let outcome = controller.click(login_link).await.unwrap();
    assert_eq!(outcome, ClickOutcome::Navigated(Some(ViewId::Login)));
    assert_eq!(visible(&controller).await, vec![ViewId::Login]);

    let page = controller.page().await;
    assert!(page.doc.element_by_id("login_form").is_some());
    let heading = page.require("pHeading").unwrap();
    assert_eq!(page.doc.text_content(heading), "Login");
}

#[tokio::test]
async fn handles_from_before_a_reload_no_longer_click() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("register_user").await.unwrap();
    let stale = controller.page().await.require("regUser_btn").unwrap();

    controller.reload().await.unwrap();
    controller.navigate("register_user").await.unwrap();
    assert_eq!(controller.click(stale).await.unwrap(), ClickOutcome::Unbound);
    assert!(backend.posted("register_user").is_none());

    let page = controller.page().await;
    assert!(!page.doc.contains(stale));
    assert!(page.doc.parent(stale).is_none());
}

#[tokio::test]
async fn replaced_form_controls_are_reclaimed() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("login").await.unwrap();
    let first = controller.page().await.require("login_btn").unwrap();
    controller.navigate("login").await.unwrap();
    let settled = controller.page().await.doc.arena_len();

    for _ in 0..5 {
        controller.navigate("login").await.unwrap();
    }
    let page = controller.page().await;
    assert_eq!(page.doc.arena_len(), settled);
    assert!(!page.doc.contains(first));
    assert_eq!(page.bindings.action(first), None);
}

#[tokio::test]
async fn register_link_opens_user_registration() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("login").await.unwrap();

    let outcome = controller.click_id("register_link").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Navigated(Some(ViewId::RegisterUser)));
    assert_eq!(visible(&controller).await, vec![ViewId::RegisterUser]);
    assert_eq!(backend.count("register_user_form"), 1);
    let page = controller.page().await;
    assert!(page.doc.element_by_id("regUser_btn").is_some());
}

#[tokio::test]
async fn unknown_view_name_keeps_current_view() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();

    assert_eq!(controller.navigate("dashboard").await.unwrap(), None);
    assert_eq!(visible(&controller).await, vec![ViewId::Home]);
}

#[tokio::test]
async fn register_user_form_is_fetched_and_decorated() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("register_user").await.unwrap();

    assert_eq!(visible(&controller).await, vec![ViewId::RegisterUser]);
    let page = controller.page().await;
    assert_eq!(page.doc.elements_by_class("required-marker").len(), 2);
    assert_eq!(page.doc.elements_by_class("checkbox_parent").len(), 1);
    let login_link = page.require("login_link").unwrap();
    assert_eq!(page.bindings.action(login_link), Some(&UiAction::OpenLogin));
    assert_eq!(backend.count("register_user_form"), 1);
}

#[tokio::test]
async fn standin_registration_follows_checked_box() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("register_user").await.unwrap();
    fill_user_form(&controller, true).await;

    let outcome = controller.click_id("regUser_btn").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Submitted(SubmitOutcome::Accepted));
    assert_eq!(visible(&controller).await, vec![ViewId::RegisterStandin]);

    let posted = backend.posted("register_user").unwrap();
    assert_eq!(posted.get("username"), Some("alice"));
    assert_eq!(posted.get("is_standin"), Some("on"));
    assert!(backend.calls().contains(&"register_standin_form:7".to_string()));

    {
        let page = controller.page().await;
        assert_eq!(page.session_user.as_ref().map(|user| user.id), Some(UserId(7)));
        assert!(page.doc.element_by_id("id_phone").is_some());
    }

    controller
        .fill_in(ViewId::RegisterStandin, "phone", "0612345678")
        .await
        .unwrap();
    let outcome = controller.click_id("regStandIn_btn").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Submitted(SubmitOutcome::Accepted));
    assert_eq!(visible(&controller).await, vec![ViewId::RegistrationPending]);
    assert_eq!(
        backend.posted("register_standin:7").unwrap().get("phone"),
        Some("0612345678")
    );
    assert!(controller.page().await.session_user.is_none());
}

#[tokio::test]
async fn plain_registration_goes_to_pending() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("register_user").await.unwrap();
    fill_user_form(&controller, false).await;

    let outcome = controller.click_id("regUser_btn").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Submitted(SubmitOutcome::Accepted));
    assert_eq!(visible(&controller).await, vec![ViewId::RegistrationPending]);
    assert_eq!(backend.posted("register_user").unwrap().get("is_standin"), None);
    assert!(!backend.calls().iter().any(|c| c.starts_with("register_standin_form")));
}

#[tokio::test]
async fn empty_required_fields_block_submission() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("register_user").await.unwrap();

    let outcome = controller.click_id("regUser_btn").await.unwrap();
    assert_eq!(
        outcome,
        ClickOutcome::Submitted(SubmitOutcome::Invalid(vec![
            "username".to_string(),
            "password1".to_string()
        ]))
    );
    assert!(backend.posted("register_user").is_none());
}

#[tokio::test]
async fn rejected_registration_shows_message_and_stays() {
    let mut fake = FakeBackend::new("home");
    fake.register_user = json!({
        "status": "error",
        "message": "Registration failed",
        "errors": {"username": ["A user with that username already exists."]}
    });
    let backend = Arc::new(fake);
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("register_user").await.unwrap();
    fill_user_form(&controller, true).await;

    let outcome = controller.click_id("regUser_btn").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Submitted(SubmitOutcome::Rejected));
    assert_eq!(visible(&controller).await, vec![ViewId::RegisterUser]);

    let page = controller.page().await;
    assert_eq!(page.message_text(), "Registration failed");
    let region = page.require("message").unwrap();
    assert!(page.doc.has_class(region, "error_message"));
    assert!(page.session_user.is_none());
}

#[tokio::test]
async fn success_without_user_aborts_standin_step() {
    let mut fake = FakeBackend::new("home");
    fake.register_user = json!({"status": "success", "message": "ok"});
    let backend = Arc::new(fake);
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("register_user").await.unwrap();
    fill_user_form(&controller, true).await;

    let err = controller.click_id("regUser_btn").await.unwrap_err();
    assert!(matches!(err, FlowError::MissingUser(_)));
    assert_eq!(visible(&controller).await, vec![ViewId::RegisterUser]);
}

#[tokio::test]
async fn failed_standin_form_fetch_leaves_container_empty() {
    let mut fake = FakeBackend::new("home");
    fake.standin_form = None;
    let backend = Arc::new(fake);
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();

    controller.load_register_standin(UserRef::new(7)).await.unwrap();
    assert_eq!(visible(&controller).await, vec![ViewId::RegisterStandin]);
    let page = controller.page().await;
    let placeholder = page.require("standInRegistration_form").unwrap();
    assert!(page.doc.children(placeholder).is_empty());
    let button = page.require("regStandIn_btn").unwrap();
    assert!(page.bindings.action(button).is_some());
}

#[tokio::test]
async fn missing_standin_fragment_is_tolerated() {
    let mut fake = FakeBackend::new("home");
    fake.standin_form = Some(None);
    let backend = Arc::new(fake);
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();

    controller.load_register_standin(UserRef::new(7)).await.unwrap();
    let page = controller.page().await;
    let placeholder = page.require("standInRegistration_form").unwrap();
    assert!(page.doc.children(placeholder).is_empty());
}

#[tokio::test]
async fn html_login_response_reloads_page() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("login").await.unwrap();
    controller
        .fill_in(ViewId::Login, "username", "alice")
        .await
        .unwrap();

    let outcome = controller.click_id("login_btn").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Submitted(SubmitOutcome::Reloaded));
    assert_eq!(backend.count("fetch_page"), 2);
    assert_eq!(backend.posted("login").unwrap().get("username"), Some("alice"));
    assert_eq!(visible(&controller).await, vec![ViewId::Home]);
}

#[tokio::test]
async fn json_login_error_appends_one_line_per_error() {
    let mut fake = FakeBackend::new("home");
    fake.login = LoginScript::Json(json!({
        "status": "error",
        "message": "Login failed",
        "errors": {
            "__all__": ["Please enter a correct username and password.", "Account is inactive."],
            "username": "This field is required."
        }
    }));
    let backend = Arc::new(fake);
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("login").await.unwrap();

    let outcome = controller.click_id("login_btn").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Submitted(SubmitOutcome::Rejected));
    assert_eq!(backend.count("fetch_page"), 1);

    let page = controller.page().await;
    let region = page.require("message").unwrap();
    assert_eq!(
        page.doc.inner_html(region),
        "Login failed<p>Please enter a correct username and password.</p>\
         <p>Account is inactive.</p><p>This field is required.</p>"
    );
    assert_eq!(page.visible_views(), vec![ViewId::Login]);
}

#[tokio::test]
async fn login_reply_after_failed_registration_is_unstyled() {
    let mut fake = FakeBackend::new("home");
    fake.register_user = json!({"status": "error", "message": "Registration failed"});
    fake.login = LoginScript::Json(json!({"status": "success", "message": "Welcome"}));
    let backend = Arc::new(fake);
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("register_user").await.unwrap();
    fill_user_form(&controller, false).await;
    controller.click_id("regUser_btn").await.unwrap();

    controller.navigate("login").await.unwrap();
    let outcome = controller.click_id("login_btn").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Submitted(SubmitOutcome::Accepted));

    let page = controller.page().await;
    assert_eq!(page.message_text(), "Welcome");
    let region = page.require("message").unwrap();
    assert!(!page.doc.has_class(region, "error_message"));
    assert!(!page.doc.has_class(region, "success_message"));
}

#[tokio::test]
async fn login_transport_failure_is_reported_inline() {
    let mut fake = FakeBackend::new("home");
    fake.login = LoginScript::Fail;
    let backend = Arc::new(fake);
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("login").await.unwrap();

    let outcome = controller.click_id("login_btn").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Submitted(SubmitOutcome::Failed));
    assert_eq!(controller.page().await.message_text(), "Error logging in");
}

#[tokio::test]
async fn submission_in_flight_rejects_second_submit() {
    let gate = Arc::new(LoginGate {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let mut fake = FakeBackend::new("home");
    fake.login = LoginScript::Json(json!({"status": "success", "message": "Welcome"}));
    fake.login_gate = Some(gate.clone());
    let backend = Arc::new(fake);
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.load_login().await.unwrap();

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_login().await }
    });
    gate.entered.notified().await;

    assert!(controller.is_busy(Flow::Login));
    assert_eq!(controller.submit_login().await.unwrap(), SubmitOutcome::Busy);
    assert_eq!(backend.count("login"), 1);

    // view switching is not blocked by the pending request
    assert_eq!(controller.show("home").await, Some(ViewId::Home));

    gate.release.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), SubmitOutcome::Accepted);
    assert!(!controller.is_busy(Flow::Login));
    assert_eq!(controller.page().await.message_text(), "Welcome");
}

#[tokio::test]
async fn profile_view_is_shown_and_filled() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    let view = controller.navigate("standin_profile").await.unwrap();
    assert_eq!(view, Some(ViewId::StandinProfile));
    assert_eq!(visible(&controller).await, vec![ViewId::StandinProfile]);

    let page = controller.page().await;
    assert_eq!(page.profile_user.as_ref().map(|user| user.id), Some(UserId(7)));
    let checkbox = page.require("id_delete_profile_pic").unwrap();
    let wrapper = page.doc.parent(checkbox).unwrap();
    assert!(page.doc.has_class(wrapper, "checkBox_div"));
}

#[tokio::test]
async fn profile_errors_concatenate_first_error_per_field() {
    let mut fake = FakeBackend::new("home");
    fake.update_profile = json!({
        "status": "error",
        "message": "Profile update failed",
        "errors": {"bio": ["Too long.", "Contains links."], "phone": ["Enter a valid phone number."]}
    });
    let backend = Arc::new(fake);
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("standin_profile").await.unwrap();
    controller
        .fill_in(ViewId::StandinProfile, "bio", "new bio")
        .await
        .unwrap();

    let outcome = controller.click_id("updateProfile_btn").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Submitted(SubmitOutcome::Rejected));
    assert_eq!(backend.posted("profile").unwrap().get("bio"), Some("new bio"));

    let page = controller.page().await;
    assert_eq!(page.message_text(), "Too long.Enter a valid phone number.");
    let region = page.require("message").unwrap();
    assert!(page.doc.has_class(region, "error_message"));
    assert_eq!(page.visible_views(), vec![ViewId::StandinProfile]);
}

#[tokio::test]
async fn profile_success_shows_message_without_navigation() {
    let backend = Arc::new(FakeBackend::new("home"));
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("standin_profile").await.unwrap();

    let outcome = controller.click_id("updateProfile_btn").await.unwrap();
    assert_eq!(outcome, ClickOutcome::Submitted(SubmitOutcome::Accepted));
    let page = controller.page().await;
    assert_eq!(page.message_text(), "Profile updated");
    assert_eq!(page.visible_views(), vec![ViewId::StandinProfile]);
}

fn standin_backend() -> FakeBackend {
    let mut fake = FakeBackend::new("standin");
    fake.page = page_html("standin", Some(7));
    fake.availchecks = Some(vec![
        json!({"id": 3, "pk": 3, "project": "Dune", "created_at": "2025-03-01T10:00:00Z"}),
        json!({"id": 4}),
    ]);
    fake
}

#[tokio::test]
async fn availchecks_bind_deferred_actions() {
    let backend = Arc::new(standin_backend());
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();

    assert_eq!(visible(&controller).await, vec![ViewId::Standin]);
    assert!(backend.calls().contains(&"availchecks:7".to_string()));
    assert_eq!(backend.count("accept_availcheck:3"), 0);

    {
        let page = controller.page().await;
        let container = page.require("standin-view").unwrap();
        let items = page.doc.elements_by_class("avail_check_li");
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| page.doc.descendants(container).contains(item)));
        assert!(items.iter().all(|item| page.doc.is_rendered(*item)));
        let first = page.require("avail_check_li_3").unwrap();
        assert!(page.doc.text_content(first).starts_with("Dune (2025-03-01)"));
    }

    let outcome = controller.click_id("accept_3").await.unwrap();
    assert_eq!(outcome, ClickOutcome::AvailCheck(AvailCheckOutcome::Accepted));
    assert_eq!(backend.count("accept_availcheck:3"), 1);

    let page = controller.page().await;
    let button = page.require("accept_3").unwrap();
    assert!(page.doc.has_class(button, "disabled"));
    assert!(page.doc.has_attr(button, "disabled"));
    let other = page.require("accept_4").unwrap();
    assert!(!page.doc.has_attr(other, "disabled"));
}

#[tokio::test]
async fn hidden_availcheck_controls_ignore_clicks() {
    let backend = Arc::new(standin_backend());
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("home").await.unwrap();

    assert_eq!(controller.click_id("accept_3").await.unwrap(), ClickOutcome::Unbound);
    assert_eq!(backend.count("accept_availcheck:3"), 0);
    let page = controller.page().await;
    let button = page.require("accept_3").unwrap();
    assert!(!page.doc.has_attr(button, "disabled"));
}

#[tokio::test]
async fn declined_confirmation_sends_nothing() {
    let backend = Arc::new(standin_backend());
    let controller = flow_controller(&backend, false);
    controller.open().await.unwrap();

    let outcome = controller.click_id("accept_4").await.unwrap();
    assert_eq!(outcome, ClickOutcome::AvailCheck(AvailCheckOutcome::Declined));
    assert_eq!(backend.count("accept_availcheck:4"), 0);
}

#[tokio::test]
async fn reject_is_not_supported() {
    let backend = Arc::new(standin_backend());
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();

    let outcome = controller.click_id("reject_3").await.unwrap();
    assert_eq!(outcome, ClickOutcome::AvailCheck(AvailCheckOutcome::Unsupported));
    assert!(!backend.calls().iter().any(|c| c.starts_with("accept_availcheck")));
}

#[tokio::test]
async fn eager_listeners_fire_at_render_time() {
    let backend = Arc::new(standin_backend());
    let controller = controller_with(
        &backend,
        true,
        FlowSettings {
            eager_availcheck_listeners: true,
        },
    );
    controller.open().await.unwrap();

    assert_eq!(backend.count("accept_availcheck:3"), 1);
    assert_eq!(backend.count("accept_availcheck:4"), 1);
    assert_eq!(controller.click_id("accept_3").await.unwrap(), ClickOutcome::Unbound);

    let page = controller.page().await;
    let button = page.require("accept_4").unwrap();
    assert!(page.doc.has_attr(button, "disabled"));
}

#[tokio::test]
async fn availcheck_fetch_failure_keeps_page_usable() {
    let mut fake = standin_backend();
    fake.availchecks = None;
    let backend = Arc::new(fake);
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();

    assert_eq!(visible(&controller).await, vec![ViewId::Standin]);
    assert!(controller.page().await.doc.elements_by_class("avail_check_li").is_empty());
}

#[tokio::test]
async fn reloading_availchecks_replaces_the_list() {
    let backend = Arc::new(standin_backend());
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.load_availchecks(UserId(7)).await.unwrap();

    assert_eq!(
        visible(&controller).await,
        vec![ViewId::Bookings, ViewId::Availchecks, ViewId::Availabilities]
    );
    {
        let page = controller.page().await;
        assert_eq!(page.doc.elements_by_class("avail_checks_div").len(), 1);
        let container = page.require("availchecks-view").unwrap();
        let items = page.doc.elements_by_class("avail_check_li");
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| page.doc.descendants(container).contains(item)));
    }

    let outcome = controller.click_id("reject_4").await.unwrap();
    assert_eq!(outcome, ClickOutcome::AvailCheck(AvailCheckOutcome::Unsupported));
}

#[tokio::test]
async fn availchecks_nav_target_loads_the_page_user() {
    let backend = Arc::new(standin_backend());
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();
    controller.navigate("availchecks").await.unwrap();

    assert_eq!(backend.count("availchecks:7"), 2);
    assert!(visible(&controller).await.contains(&ViewId::Availchecks));
    assert_eq!(controller.page().await.doc.elements_by_class("avail_check_li").len(), 2);
}

#[tokio::test]
async fn admin_page_is_patched_on_open() {
    let mut fake = FakeBackend::new("admin");
    fake.page = r#"<html><head><title>Change | StandIn | Django site admin</title></head><body>
<div><fieldset><div class="field-display_main_image"></div><div class="field-list_uploads"><p class="readonly">x.png</p></div></fieldset></div>
<div class="submit-row"></div></body></html>"#
        .to_string();
    let backend = Arc::new(fake);
    let controller = flow_controller(&backend, true);
    controller.open().await.unwrap();

    let page = controller.page().await;
    assert!(page.doc.elements_by_class("field-list_uploads").is_empty());
    assert_eq!(page.doc.elements_by_class("fieldsets").len(), 1);
    let submit_row = page.doc.elements_by_class("submit-row")[0];
    assert!(page.doc.has_class(submit_row, "col6"));
}
