use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use minijinja::{context, Environment};
use serde::Deserialize;
use tracing::{error, warn};

use crate::config::Config;
use crate::llm::LlmClient;
use crate::predictor::Predictor;
use crate::store::{ClearOutcome, LogDump, LogStore};
use crate::telegram::{TelegramClient, Update};
use crate::webhook::WebhookController;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("main.html", include_str!("../templates/main.html")),
    ("llama.html", include_str!("../templates/llama.html")),
    (
        "llama_reply.html",
        include_str!("../templates/llama_reply.html"),
    ),
    ("deepseek.html", include_str!("../templates/deepseek.html")),
    (
        "deepseek_reply.html",
        include_str!("../templates/deepseek_reply.html"),
    ),
    ("dbs.html", include_str!("../templates/dbs.html")),
    (
        "prediction.html",
        include_str!("../templates/prediction.html"),
    ),
    ("telegram.html", include_str!("../templates/telegram.html")),
    (
        "stop_telegram.html",
        include_str!("../templates/stop_telegram.html"),
    ),
    ("user_log.html", include_str!("../templates/user_log.html")),
    (
        "delete_log.html",
        include_str!("../templates/delete_log.html"),
    ),
    ("sepia.html", include_str!("../templates/sepia.html")),
];

/// Shared application state, constructed once at startup.
pub struct AppState {
    pub config: Config,
    pub llm: LlmClient,
    pub webhook: WebhookController,
    pub store: LogStore,
    templates: Environment<'static>,
}

impl AppState {
    pub fn new(config: Config, store: LogStore) -> Result<Self> {
        let llm = LlmClient::new(config.llm.clone());
        let telegram = TelegramClient::new(config.telegram.clone());
        let webhook = WebhookController::new(
            telegram,
            llm.clone(),
            store.clone(),
            config.llm.reasoner_model.clone(),
            config.callback_url(),
        );

        let mut templates = Environment::new();
        for &(name, source) in TEMPLATES {
            templates
                .add_template(name, source)
                .with_context(|| format!("Failed to compile template {name}"))?;
        }

        Ok(Self {
            config,
            llm,
            webhook,
            store,
            templates,
        })
    }

    /// Render a page, passing `r` as the result line. Rendering itself must
    /// never take a page down, so a template failure degrades to plain text.
    fn render(&self, name: &str, result: Option<&str>) -> Html<String> {
        let rendered = self
            .templates
            .get_template(name)
            .and_then(|tmpl| tmpl.render(context! { r => result }));

        match rendered {
            Ok(body) => Html(body),
            Err(e) => {
                error!("Failed to render {}: {:#}", name, e);
                Html(result.unwrap_or("Something went wrong.").to_string())
            }
        }
    }
}

/// Every route accepts GET and POST with identical semantics, as the hosting
/// pages link and post to them interchangeably.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index).post(index))
        .route("/main", get(main_page).post(main_page))
        .route("/llama", get(llama).post(llama))
        .route("/llama_reply", get(llama_reply).post(llama_reply))
        .route("/deepseek", get(deepseek).post(deepseek))
        .route("/deepseek_reply", get(deepseek_reply).post(deepseek_reply))
        .route("/dbs", get(dbs).post(dbs))
        .route("/prediction", get(prediction).post(prediction))
        .route("/telegram", get(telegram).post(telegram))
        .route("/stop_telegram", get(stop_telegram).post(stop_telegram))
        .route("/webhook", get(webhook).post(webhook))
        .route("/user_log", get(user_log).post(user_log))
        .route("/delete_log", get(delete_log).post(delete_log))
        .route("/sepia", get(sepia).post(sepia))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct QueryForm {
    #[serde(default)]
    q: Option<String>,
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    state.render("index.html", None)
}

async fn main_page(State(state): State<Arc<AppState>>) -> Html<String> {
    state.render("main.html", None)
}

async fn llama(State(state): State<Arc<AppState>>) -> Html<String> {
    state.render("llama.html", None)
}

async fn deepseek(State(state): State<Arc<AppState>>) -> Html<String> {
    state.render("deepseek.html", None)
}

async fn dbs(State(state): State<Arc<AppState>>) -> Html<String> {
    state.render("dbs.html", None)
}

async fn sepia(State(state): State<Arc<AppState>>) -> Html<String> {
    state.render("sepia.html", None)
}

async fn llama_reply(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QueryForm>,
) -> Html<String> {
    completion_page(&state, "llama_reply.html", &state.config.llm.chat_model, form.q).await
}

async fn deepseek_reply(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QueryForm>,
) -> Html<String> {
    completion_page(&state, "deepseek_reply.html", &state.config.llm.reasoner_model, form.q).await
}

async fn completion_page(
    state: &AppState,
    template: &str,
    model: &str,
    q: Option<String>,
) -> Html<String> {
    let result = match q.as_deref().map(str::trim) {
        None | Some("") => "No question was provided.".to_string(),
        Some(question) => match state.llm.complete(model, question).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Completion failed on {}: {:#}", template, e);
                format!("Error: {}", e)
            }
        },
    };
    state.render(template, Some(&result))
}

async fn prediction(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QueryForm>,
) -> Html<String> {
    let result = match form.q.as_deref().map(str::trim) {
        None | Some("") => "No value was provided.".to_string(),
        Some(raw) => match raw.parse::<f64>() {
            Err(_) => format!("'{}' is not a number.", raw),
            Ok(x) => match Predictor::load(&state.config.predictor.artifact_path) {
                Ok(model) => model.predict(x).to_string(),
                Err(e) => {
                    error!("Prediction model unavailable: {:#}", e);
                    format!("Error: {}", e)
                }
            },
        },
    };
    state.render("prediction.html", Some(&result))
}

async fn telegram(State(state): State<Arc<AppState>>) -> Html<String> {
    let status = state.webhook.enable().await;
    state.render("telegram.html", Some(status))
}

async fn stop_telegram(State(state): State<Arc<AppState>>) -> Html<String> {
    let status = state.webhook.disable().await;
    state.render("stop_telegram.html", Some(status))
}

/// Telegram delivery endpoint. The platform expects a fast 2xx no matter what
/// happened internally, so the body is parsed by hand and every outcome,
/// including an undecodable payload, acknowledges with `200 "ok"`.
async fn webhook(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> (StatusCode, &'static str) {
    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            state.webhook.handle_update(update).await;
        }
        Err(e) => {
            warn!("Undecodable webhook payload: {}", e);
        }
    }
    (StatusCode::OK, "ok")
}

async fn user_log(State(state): State<Arc<AppState>>) -> Html<String> {
    let result = match state.store.list_all().await {
        Ok(dump) => format_log_dump(&dump),
        Err(e) => {
            error!("Failed to read user log: {:#}", e);
            format!("Error: {}", e)
        }
    };
    state.render("user_log.html", Some(&result))
}

async fn delete_log(State(state): State<Arc<AppState>>) -> Html<String> {
    let result = match state.store.clear_all().await {
        Ok(ClearOutcome::Cleared) => "All user logs have been deleted.".to_string(),
        Ok(ClearOutcome::NoTable) => "Table 'user' does not exist.".to_string(),
        Err(e) => {
            error!("Failed to clear user log: {:#}", e);
            format!("Error: {}", e)
        }
    };
    state.render("delete_log.html", Some(&result))
}

/// One "sender - message" line per entry, oldest first. Extracted so it can
/// be unit-tested.
fn format_log_dump(dump: &LogDump) -> String {
    match dump {
        LogDump::NoTable => "Table 'user' does not exist.".to_string(),
        LogDump::Rows(rows) if rows.is_empty() => "No logs found.".to_string(),
        LogDump::Rows(rows) => rows
            .iter()
            .map(|entry| format!("{} - {}", entry.sender, entry.message))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LogEntry;

    #[test]
    fn test_format_missing_table() {
        assert_eq!(
            format_log_dump(&LogDump::NoTable),
            "Table 'user' does not exist."
        );
    }

    #[test]
    fn test_format_empty_log() {
        assert_eq!(format_log_dump(&LogDump::Rows(vec![])), "No logs found.");
    }

    #[test]
    fn test_format_entries_one_per_line() {
        let dump = LogDump::Rows(vec![
            LogEntry {
                sender: "42".to_string(),
                message: "hello".to_string(),
            },
            LogEntry {
                sender: "43".to_string(),
                message: "goodbye".to_string(),
            },
        ]);
        assert_eq!(format_log_dump(&dump), "42 - hello\n43 - goodbye");
    }

    #[test]
    fn test_all_templates_compile() {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source).unwrap();
        }
        for &(name, _) in TEMPLATES {
            let tmpl = env.get_template(name).unwrap();
            tmpl.render(context! { r => Some("result line") }).unwrap();
        }
    }
}
