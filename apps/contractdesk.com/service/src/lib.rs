use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Form, Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod config;
pub mod envelope;
pub mod htmx;
pub mod proxy;
pub mod web;
pub mod webhook;


use contractdesk_client_core::dropdown::EntityKind;
use contractdesk_client_core::form::{
    FormSelection, on_agent_change, on_contract_type_change, on_property_change,
};
use contractdesk_client_core::submit::{Banner, SubmissionPipeline, TemplateCreation};
use contractdesk_client_core::sync::{
    DropdownSynchronizer, FetchOutcome, FormEngine, ProxyApi, RetryPolicy, Sleeper,
};

use crate::config::Config;
use crate::envelope::{
    action_failed, action_ok, action_server_error, message_response, read_response,
    read_server_error,
};
use crate::proxy::{DatastoreProxy, WriteOutcome};
use crate::web::FormPageView;
use crate::webhook::WebhookClient;

const SERVICE_NAME: &str = "contractdesk-form-service";
const CACHE_IMMUTABLE_ONE_YEAR: &str = "public, max-age=31536000, immutable";
const CACHE_SHORT_LIVED: &str = "public, max-age=60";

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    engine: Arc<RwLock<FormEngine>>,
    proxy: DatastoreProxy,
    pipeline: Arc<Mutex<SubmissionPipeline<WebhookClient>>>,
    template_flow: Arc<Mutex<TemplateCreation<DatastoreProxy>>>,
    started_at: SystemTime,
}

pub fn build_state(config: Config) -> AppState {
    let proxy = DatastoreProxy::from_config(&config);
    let webhook = WebhookClient::from_config(&config);
    AppState {
        config: Arc::new(config),
        engine: Arc::new(RwLock::new(FormEngine::default())),
        proxy: proxy.clone(),
        pipeline: Arc::new(Mutex::new(SubmissionPipeline::new(webhook))),
        template_flow: Arc::new(Mutex::new(TemplateCreation::new(proxy))),
        started_at: SystemTime::now(),
    }
}

pub fn build_router(config: Config) -> Router {
    build_router_with_state(build_state(config))
}

pub fn build_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(form_page))
        .route("/healthz", get(health))
        .route("/readyz", get(readiness))
        .route("/api/users", get(api_users))
        .route("/api/contract-templates", get(api_contract_templates))
        .route("/api/listings", get(api_listings))
        .route("/api/templates", post(api_create_template))
        .route("/submit", post(api_submit))
        .route("/form/submit", post(form_submit))
        .route("/form/template", post(form_template))
        .route("/form/agent-email", get(form_agent_email))
        .route("/form/contract-type-change", get(form_contract_type_change))
        .route("/form/property-change", get(form_property_change))
        .route("/form/banner/clear", get(form_banner_clear))
        .route("/assets/*path", get(static_asset))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http()),
        )
}

pub fn init_tracing(filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

fn populate_policy(config: &Config) -> RetryPolicy {
    RetryPolicy {
        delay: Duration::from_millis(config.populate_retry_delay_ms),
        max_attempts: config.populate_max_attempts,
    }
}

/// Startup population: waits out the initial delay, then runs the three
/// per-kind flows concurrently. Each flow owns its own transport retry loop;
/// the engine lock is only taken for the single-assignment apply step.
pub async fn run_dropdown_population(state: AppState) {
    tokio::time::sleep(Duration::from_millis(state.config.populate_initial_delay_ms)).await;
    for kind in EntityKind::ALL {
        tokio::spawn(populate_kind(state.clone(), kind));
    }
}

async fn populate_kind(state: AppState, kind: EntityKind) {
    let synchronizer = DropdownSynchronizer::new(
        state.proxy.clone(),
        TokioSleeper,
        populate_policy(&state.config),
    );

    match synchronizer.fetch(kind).await {
        FetchOutcome::Fetched(records) => {
            let count = records.len();
            let mut engine = state.engine.write().await;
            engine.apply(records);
            info!(kind = kind.as_str(), count, "dropdown populated");
        }
        FetchOutcome::Rejected { message } => {
            warn!(kind = kind.as_str(), %message, "dropdown population rejected");
        }
        FetchOutcome::GaveUp { attempts } => {
            warn!(kind = kind.as_str(), attempts, "dropdown population gave up");
        }
    }
}

async fn page_view(state: &AppState, banner: Option<Banner>) -> FormPageView {
    let engine = state.engine.read().await;
    FormPageView {
        dropdowns: engine.dropdowns.clone(),
        banner,
        banner_ttl_ms: state.config.banner_ttl_ms,
    }
}

async fn form_page(State(state): State<AppState>) -> Html<String> {
    Html(web::render_page(&page_view(&state, None).await))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    datastore_configured: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = state
        .started_at
        .elapsed()
        .map(|duration| duration.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        datastore_configured: state.proxy.is_configured(),
    })
}

/// Ready only once every dropdown has populated successfully at least once;
/// until then the controls are placeholder-only by contract.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine.read().await;
    if engine.ready() {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "agents": engine.cache.agent_count(),
                "contract_templates": engine.cache.template_count(),
                "listings": engine.cache.property_count(),
            })),
        )
    } else {
        let pending: Vec<&str> = EntityKind::ALL
            .iter()
            .filter(|kind| !engine.kind_populated(**kind))
            .map(|kind| kind.as_str())
            .collect();
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready", "pending": pending})),
        )
    }
}

async fn api_users(State(state): State<AppState>) -> Response {
    match state.proxy.list_agents().await {
        Ok(envelope) => read_response(envelope).into_response(),
        Err(error) => {
            warn!(%error, "users proxy read failed");
            read_server_error(format!("Server error fetching users: {error}")).into_response()
        }
    }
}

async fn api_contract_templates(State(state): State<AppState>) -> Response {
    match state.proxy.list_templates().await {
        Ok(envelope) => read_response(envelope).into_response(),
        Err(error) => {
            warn!(%error, "contract templates proxy read failed");
            read_server_error(format!("Server error fetching contract templates: {error}"))
                .into_response()
        }
    }
}

async fn api_listings(State(state): State<AppState>) -> Response {
    match state.proxy.list_properties().await {
        Ok(envelope) => read_response(envelope).into_response(),
        Err(error) => {
            warn!(%error, "listings proxy read failed");
            read_server_error(format!("Server error fetching listings: {error}")).into_response()
        }
    }
}

/// Generic form-submit endpoint: persists when the datastore is configured,
/// echoes the submission otherwise.
async fn api_submit(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    info!("form submitted");
    match state.proxy.create_contract(&payload).await {
        WriteOutcome::Created(row) => {
            action_ok("Contract saved to database successfully!", Some(row)).into_response()
        }
        WriteOutcome::Failed(message) => {
            action_failed(format!("Error saving to database: {message}"), Some(payload))
                .into_response()
        }
        WriteOutcome::NotConfigured => action_ok(
            "Form submitted successfully! (Database not configured)",
            Some(payload),
        )
        .into_response(),
        WriteOutcome::Unreachable(message) => {
            warn!(%message, "contract persist unreachable");
            action_server_error("Server error processing form", message).into_response()
        }
    }
}

async fn api_create_template(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    match state.proxy.create_template_value(&payload).await {
        WriteOutcome::Created(row) => {
            action_ok("Template created successfully!", Some(row)).into_response()
        }
        WriteOutcome::Failed(message) => {
            action_failed(format!("Error creating template: {message}"), None).into_response()
        }
        WriteOutcome::NotConfigured => {
            action_failed(proxy::NOT_CONFIGURED_MESSAGE, None).into_response()
        }
        WriteOutcome::Unreachable(message) => {
            warn!(%message, "template persist unreachable");
            action_server_error("Server error creating template", message).into_response()
        }
    }
}

/// The posted form controls, named exactly as the page names them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContractFormBody {
    agent: String,
    #[serde(rename = "contractType")]
    contract_type: String,
    property: String,
    #[serde(rename = "sellerName")]
    seller_name: String,
    #[serde(rename = "customerName")]
    customer_name: String,
    #[serde(rename = "signingPlace")]
    signing_place: String,
}

impl ContractFormBody {
    fn into_selection(self) -> FormSelection {
        FormSelection {
            agent_id: self.agent,
            template_id: self.contract_type,
            property_id: self.property,
            seller_name: self.seller_name,
            customer_name: self.customer_name,
            signing_place: self.signing_place,
        }
    }
}

async fn form_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(body): Form<ContractFormBody>,
) -> Response {
    let mut selection = body.into_selection();

    // Snapshot the cache and template options before any suspension point;
    // a population pass landing mid-submission must not split the join.
    let (cache, templates) = {
        let engine = state.engine.read().await;
        (engine.cache.clone(), engine.dropdowns.templates.clone())
    };

    let report = {
        let mut pipeline = state.pipeline.lock().await;
        pipeline
            .submit(&mut selection, &cache, &templates, Utc::now())
            .await
    };

    if !htmx::is_hx_request(&headers) {
        return Html(web::render_page(&page_view(&state, Some(report.banner)).await))
            .into_response();
    }

    if report.reset_form {
        // Swap the whole shell: cleared form, hidden email line, banner.
        let view = page_view(&state, Some(report.banner)).await;
        let mut response =
            htmx::fragment_response(web::render_form_fragment(&view), StatusCode::OK);
        htmx::set_retarget_header(&mut response, "#cd-form-shell");
        htmx::set_reswap_header(&mut response, "outerHTML");
        htmx::set_trigger_header(&mut response, "contract-submitted");
        response
    } else {
        htmx::fragment_response(
            web::render_banner_fragment(Some(&report.banner), state.config.banner_ttl_ms),
            StatusCode::OK,
        )
    }
}

async fn form_template(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(body): Form<ContractFormBody>,
) -> Response {
    let selection = body.into_selection();

    let report = {
        let mut flow = state.template_flow.lock().await;
        flow.create(&selection, Utc::now()).await
    };

    if !htmx::is_hx_request(&headers) {
        return Html(web::render_page(&page_view(&state, Some(report.banner)).await))
            .into_response();
    }

    htmx::fragment_response(
        web::render_banner_fragment(Some(&report.banner), state.config.banner_ttl_ms),
        StatusCode::OK,
    )
}

#[derive(Debug, Deserialize)]
struct AgentEmailParams {
    #[serde(default)]
    agent: String,
}

async fn form_agent_email(
    State(state): State<AppState>,
    Query(params): Query<AgentEmailParams>,
) -> Response {
    let engine = state.engine.read().await;
    let display = on_agent_change(params.agent.trim(), &engine.cache);
    htmx::fragment_response(web::render_agent_email_fragment(&display), StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct ContractTypeParams {
    #[serde(default, rename = "contractType")]
    contract_type: String,
}

async fn form_contract_type_change(
    State(state): State<AppState>,
    Query(params): Query<ContractTypeParams>,
) -> StatusCode {
    let engine = state.engine.read().await;
    match on_contract_type_change(params.contract_type.trim(), &engine.dropdowns.templates) {
        Some(selection) => info!(
            template_id = %selection.template_id,
            template_name = selection.template_name.as_deref().unwrap_or("<unknown>"),
            "contract type selected"
        ),
        None => info!("no contract type selected"),
    }
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct PropertyParams {
    #[serde(default)]
    property: String,
}

async fn form_property_change(
    State(state): State<AppState>,
    Query(params): Query<PropertyParams>,
) -> StatusCode {
    let engine = state.engine.read().await;
    match on_property_change(params.property.trim(), &engine.cache) {
        Some(selection) => info!(
            list_num = %selection.list_num,
            list_name = selection.list_name.as_deref().unwrap_or("<unknown>"),
            "property selected"
        ),
        None => info!("no property selected"),
    }
    StatusCode::NO_CONTENT
}

async fn form_banner_clear(State(state): State<AppState>) -> Response {
    htmx::fragment_response(
        web::render_banner_fragment(None, state.config.banner_ttl_ms),
        StatusCode::OK,
    )
}

async fn static_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, envelope::ReadResponse<Value>> {
    let relative_path = normalize_static_path(&path).ok_or_else(|| {
        message_response(
            StatusCode::NOT_FOUND,
            format!("Asset '{}' was not found.", path),
        )
    })?;

    let static_root = state.config.static_dir.as_path();
    let preferred = static_root.join("assets").join(&relative_path);
    let fallback = static_root.join(&relative_path);

    let asset_path = if preferred.is_file() {
        preferred
    } else if fallback.is_file() {
        fallback
    } else {
        return Err(message_response(
            StatusCode::NOT_FOUND,
            format!("Asset '{}' was not found.", relative_path),
        ));
    };

    let cache_control = if is_hashed_asset_path(&relative_path) {
        CACHE_IMMUTABLE_ONE_YEAR
    } else {
        CACHE_SHORT_LIVED
    };

    build_static_response(&asset_path, cache_control)
        .await
        .map_err(map_static_error)
}

async fn build_static_response(
    file_path: &FsPath,
    cache_control: &'static str,
) -> Result<Response, StaticResponseError> {
    let bytes = tokio::fs::read(file_path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StaticResponseError::NotFound(format!(
                "Static file '{}' was not found.",
                file_path.display()
            ))
        } else {
            StaticResponseError::Io(source)
        }
    })?;

    let content_type = mime_guess::from_path(file_path).first_or_octet_stream();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_str(content_type.as_ref())
            .map_err(|_| StaticResponseError::InvalidHeader(content_type.to_string()))?,
    );
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static(cache_control));

    Ok(response)
}

#[derive(Debug, thiserror::Error)]
enum StaticResponseError {
    #[error("{0}")]
    NotFound(String),
    #[error("static file read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid header value '{0}'")]
    InvalidHeader(String),
}

fn map_static_error(error: StaticResponseError) -> envelope::ReadResponse<Value> {
    match error {
        StaticResponseError::NotFound(message) => message_response(StatusCode::NOT_FOUND, message),
        StaticResponseError::Io(_) | StaticResponseError::InvalidHeader(_) => message_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to serve static asset.",
        ),
    }
}

/// Rejects empty, dot, and dot-dot segments so a request can never escape
/// the static root.
fn normalize_static_path(path: &str) -> Option<String> {
    let trimmed = path.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/').map(str::trim) {
        if segment.is_empty() || segment == "." || segment == ".." {
            return None;
        }
        segments.push(segment);
    }

    Some(segments.join("/"))
}

/// Content-hashed filenames (`name-<hash>.ext`) are safe to cache forever.
fn is_hashed_asset_path(path: &str) -> bool {
    FsPath::new(path)
        .file_name()
        .and_then(|value| value.to_str())
        .and_then(|file_name| file_name.rsplit_once('.'))
        .and_then(|(stem, _ext)| stem.rsplit_once('-'))
        .map(|(_, hash)| hash.len() >= 8 && hash.chars().all(|ch| ch.is_ascii_alphanumeric()))
        .unwrap_or(false)
}
