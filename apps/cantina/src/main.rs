mod config;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::CantinaClient;
use shared::domain::ViewId;
use tracing::info;
use tracing_subscriber::EnvFilter;
use view_core::{
    enhance::STANDIN_FIELD, AutoConfirm, ClickOutcome, FlowController, Host, SubmitOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "cantina", about = "Drive the StandIn Cantina pages from a terminal")]
struct Cli {
    /// Config file; `cantina.toml` in the working directory is read when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    log_filter: Option<String>,
    /// Run availability-check handlers while the list is rendered.
    #[arg(long)]
    eager_availcheck_listeners: bool,
    /// Answer yes to every confirmation prompt.
    #[arg(long, short = 'y')]
    yes: bool,
    #[command(flatten)]
    credentials: Credentials,
    #[command(subcommand)]
    command: Command,
}

/// Signs in before the command runs when both are given.
#[derive(Args, Debug)]
struct Credentials {
    #[arg(long, global = true)]
    username: Option<String>,
    #[arg(long, global = true)]
    password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the landing page and optionally switch to a view.
    Show { view: Option<String> },
    /// Register a user, continuing with the stand-in form when `--standin` is set.
    Register {
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        #[arg(long)]
        standin: bool,
        #[arg(long = "standin-field", value_parser = parse_field)]
        standin_fields: Vec<(String, String)>,
    },
    Login,
    /// Show the stand-in profile form, updating it when fields are given.
    Profile {
        #[arg(long = "set", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// List pending availability checks and act on them.
    Availchecks {
        #[arg(long)]
        accept: Vec<i64>,
        #[arg(long)]
        reject: Vec<i64>,
    },
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

struct StdinConfirm;

impl Host for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url.clone() {
        settings.base_url = base_url;
    }
    if let Some(filter) = cli.log_filter.clone() {
        settings.log_filter = filter;
    }
    if cli.eager_availcheck_listeners {
        settings.eager_availcheck_listeners = true;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = CantinaClient::new(settings.client()).context("building backend client")?;
    info!(base_url = %client.base_url(), "opening cantina");
    let host: Arc<dyn Host> = if cli.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(StdinConfirm)
    };
    let controller = FlowController::new(Arc::new(client), host, settings.flows());
    controller.open().await.context("opening landing page")?;

    if let (Some(username), Some(password)) = (&cli.credentials.username, &cli.credentials.password)
    {
        if !matches!(cli.command, Command::Login) {
            let outcome = login(&controller, username, password).await?;
            println!("login: {outcome:?}");
        }
    }

    match cli.command {
        Command::Show { view } => {
            if let Some(view) = view {
                if controller.navigate(&view).await?.is_none() {
                    bail!("unknown view '{view}'");
                }
            }
        }
        Command::Register {
            fields,
            standin,
            standin_fields,
        } => {
            controller.navigate("register_user").await?;
            for (name, value) in &fields {
                controller.fill_in(ViewId::RegisterUser, name, value).await?;
            }
            controller
                .set_checked_in(ViewId::RegisterUser, STANDIN_FIELD, standin)
                .await?;
            let outcome = submit(&controller, "regUser_btn").await?;
            println!("register_user: {outcome:?}");

            if standin && outcome == SubmitOutcome::Accepted {
                for (name, value) in &standin_fields {
                    controller
                        .fill_in(ViewId::RegisterStandin, name, value)
                        .await?;
                }
                let outcome = submit(&controller, "regStandIn_btn").await?;
                println!("register_standin: {outcome:?}");
            }
        }
        Command::Login => {
            let (Some(username), Some(password)) =
                (&cli.credentials.username, &cli.credentials.password)
            else {
                bail!("login needs --username and --password");
            };
            let outcome = login(&controller, username, password).await?;
            println!("login: {outcome:?}");
        }
        Command::Profile { fields } => {
            controller.navigate("standin_profile").await?;
            if !fields.is_empty() {
                for (name, value) in &fields {
                    controller
                        .fill_in(ViewId::StandinProfile, name, value)
                        .await?;
                }
                let outcome = submit(&controller, "updateProfile_btn").await?;
                println!("profile: {outcome:?}");
            }
        }
        Command::Availchecks { accept, reject } => {
            let (template, user) = {
                let page = controller.page().await;
                (page.template.clone(), page.page_user)
            };
            let user = user.context("page has no signed-in user; pass --username and --password")?;
            if template.as_deref() != Some("standin") {
                controller.load_availchecks(user).await?;
            }
            for id in accept {
                let outcome = controller.click_id(&format!("accept_{id}")).await?;
                println!("accept {id}: {}", describe(&outcome));
            }
            for id in reject {
                let outcome = controller.click_id(&format!("reject_{id}")).await?;
                println!("reject {id}: {}", describe(&outcome));
            }
        }
    }

    print_page(&controller).await;
    Ok(())
}

async fn login(controller: &FlowController, username: &str, password: &str) -> Result<SubmitOutcome> {
    controller.navigate("login").await?;
    controller.fill_in(ViewId::Login, "username", username).await?;
    controller.fill_in(ViewId::Login, "password", password).await?;
    submit(controller, "login_btn").await
}

async fn submit(controller: &FlowController, button: &str) -> Result<SubmitOutcome> {
    match controller.click_id(button).await? {
        ClickOutcome::Submitted(outcome) => Ok(outcome),
        other => bail!("{button} is not a submit control ({})", describe(&other)),
    }
}

fn describe(outcome: &ClickOutcome) -> String {
    match outcome {
        ClickOutcome::Unbound => "no action bound".to_string(),
        ClickOutcome::Navigated(Some(view)) => format!("showing {view}"),
        ClickOutcome::Navigated(None) => "unknown view".to_string(),
        ClickOutcome::Submitted(outcome) => format!("{outcome:?}"),
        ClickOutcome::AvailCheck(outcome) => format!("{outcome:?}"),
    }
}

async fn print_page(controller: &FlowController) {
    let page = controller.page().await;
    let views: Vec<&str> = page.visible_views().iter().map(|view| view.as_str()).collect();
    println!("visible: {}", views.join(", "));

    let message = page.message_text();
    if !message.trim().is_empty() {
        println!("message: {}", message.trim());
    }
    for item in page
        .doc
        .elements_by_class("avail_check_li")
        .into_iter()
        .filter(|item| page.doc.is_rendered(*item))
    {
        let id = page.doc.attr(item, "id").unwrap_or_default();
        let summary = page
            .doc
            .first_element_child(item)
            .map(|span| page.doc.text_content(span))
            .unwrap_or_default();
        println!("  {id}: {summary}");
    }
}
