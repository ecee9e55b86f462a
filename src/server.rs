//! HTTP surface: router, middleware and the thin per-resource handlers that
//! delegate to the generic service.

use crate::config::Config;
use crate::db::Database;
use crate::error::ServiceError;
use crate::resources;
use crate::security::constant_time_compare;
use crate::service::{ImageStore, Key, ListParams, Record, Resource, UploadedImage};
use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Request bodies: JSON stays small, multipart must fit a 4 MB image.
const MAX_JSON_BODY: usize = 2 * 1024 * 1024;
const MAX_REQUEST_BODY: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub images: ImageStore,
    pub config: Arc<Config>,
    resources: Arc<HashMap<&'static str, Arc<Resource>>>,
}

impl AppState {
    pub fn new(config: Config, db: Database, images: ImageStore) -> Self {
        let resources = Arc::new(resources::registry(&config));
        Self {
            db,
            images,
            config: Arc::new(config),
            resources,
        }
    }

    /// Names are route-table constants, so a miss is a programming error.
    fn resource(&self, name: &str) -> Arc<Resource> {
        self.resources
            .get(name)
            .cloned()
            .expect("resource should be registered")
    }
}

/// Language resolved by the gate middleware for localized public routes.
#[derive(Debug, Clone)]
pub struct RequestLang(pub String);

pub fn router(state: AppState) -> Router {
    let language_gated = Router::new()
        .route("/events", get(public_events))
        .route("/home_events", get(home_events))
        .route("/messages", get(public_messages))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            language_gate,
        ));

    let admin = Router::new()
        .route("/events", get(admin_events).post(create_event))
        .route(
            "/events/:id",
            get(admin_get_event).put(update_event).delete(delete_event),
        )
        .route("/geocaches", get(admin_geocaches).post(create_geocache))
        .route(
            "/geocaches/:id",
            get(admin_get_geocache)
                .put(update_geocache)
                .delete(delete_geocache),
        )
        .route("/messages", get(admin_messages).post(create_message))
        .route(
            "/messages/:id",
            get(admin_get_message)
                .put(update_message)
                .delete(delete_message),
        )
        .route("/languages", get(admin_languages).post(create_language))
        .route(
            "/languages/:code",
            axum::routing::put(update_language).delete(delete_language),
        )
        .route("/static", get(admin_static).post(create_static))
        .route(
            "/static/:property",
            axum::routing::put(update_static).delete(delete_static),
        )
        .route("/socials", get(admin_socials).post(create_social))
        .route(
            "/socials/:id",
            axum::routing::put(update_social).delete(delete_social),
        )
        .route("/contact/form/responses", get(admin_contact_responses))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(language_gated)
        .route("/geocaches", get(public_geocaches))
        .route("/languages", get(public_languages))
        .route("/static", get(public_static))
        .route("/socials", get(public_socials))
        .route("/images/:dir/:filename", get(serve_image))
        .route("/contact/form/responses", post(create_contact_response))
        .route("/health", get(health))
        .nest("/admin", admin)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==================== Middleware ====================

#[derive(Debug, Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

/// Reject requests whose `lang` parameter is not a known language code;
/// absent means the configured default.
async fn language_gate(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    mut request: Request,
    next: Next,
) -> Response {
    let lang = query
        .lang
        .unwrap_or_else(|| state.config.default_language.clone());

    match state.db.language_exists(&lang) {
        Ok(true) => {
            request
                .extensions_mut()
                .insert(RequestLang(lang.to_uppercase()));
            next.run(request).await
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("Language code: \"{}\" is not supported", lang)
            })),
        )
            .into_response(),
        Err(err) => failure_response(ServiceError::Db(err)),
    }
}

/// Bearer-token check for the admin surface, compared in constant time.
async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| constant_time_compare(token, &state.config.admin_api_token))
        .unwrap_or(false);

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "access denied"})),
        )
            .into_response();
    }
    next.run(request).await
}

// ==================== Generic Handler Bodies ====================

fn list_response(
    state: &AppState,
    name: &str,
    mut params: ListParams,
    lang: Option<String>,
    is_admin: bool,
) -> Response {
    if lang.is_some() {
        params.lang = lang;
    }
    let resource = state.resource(name);
    match resource.all(&state.db, &params, is_admin) {
        Ok(result) => Json(result).into_response(),
        Err(err) => failure_response(err),
    }
}

fn get_response(state: &AppState, name: &str, raw_key: &str) -> Response {
    let resource = state.resource(name);
    let Some(key) = Key::parse(resource.config.key, raw_key) else {
        return not_found_response(raw_key);
    };
    match resource.get_by_key(&state.db, &key, None, true) {
        Ok(Some(entity)) => Json(json!({"data": entity})).into_response(),
        Ok(None) => not_found_response(raw_key),
        Err(err) => failure_response(err),
    }
}

async fn create_response(state: &AppState, name: &str, request: Request) -> Response {
    let (data, image) = match parse_payload(request).await {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let resource = state.resource(name);
    match resource.add(&state.db, &state.images, data, image) {
        Ok(entity) => Json(json!({"data": entity})).into_response(),
        Err(err) => failure_response(err),
    }
}

async fn update_response(state: &AppState, name: &str, raw_key: &str, request: Request) -> Response {
    let (data, image) = match parse_payload(request).await {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let resource = state.resource(name);
    let Some(key) = Key::parse(resource.config.key, raw_key) else {
        return failure_response(ServiceError::NotFound(raw_key.to_string()));
    };
    match resource.update(&state.db, &state.images, &key, data, image) {
        Ok(entity) => Json(json!({"data": entity})).into_response(),
        Err(err) => failure_response(err),
    }
}

fn delete_response(state: &AppState, name: &str, raw_key: &str) -> Response {
    let resource = state.resource(name);
    let Some(key) = Key::parse(resource.config.key, raw_key) else {
        return failure_response(ServiceError::NotFound(raw_key.to_string()));
    };
    match resource.delete(&state.db, &key) {
        Ok(deleted) => Json(json!({"deleted": deleted})).into_response(),
        Err(err) => failure_response(err),
    }
}

/// Expected failures keep the observed contract: HTTP 200 with an `errors`
/// body. Storage faults become opaque 500s.
fn failure_response(err: ServiceError) -> Response {
    match err.as_bag() {
        Some(bag) => (StatusCode::OK, Json(json!({"errors": bag}))).into_response(),
        None => {
            error!("service failure: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error"})),
            )
                .into_response()
        }
    }
}

fn not_found_response(key: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "errors": {"item_not_found": [format!("No item with key: {} was found", key)]}
        })),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
}

/// Mutation payloads arrive either as a JSON object or as a multipart form
/// (scalar fields as text parts, translations as a JSON string part, the
/// file part named `image`).
async fn parse_payload(request: Request) -> Result<(Record, Option<UploadedImage>), Response> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| bad_request("Invalid multipart body"))?;

        let mut data = Record::new();
        let mut image = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| bad_request("Invalid multipart body"))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| bad_request("Invalid multipart body"))?;
                image = Some(UploadedImage::new(file_name, bytes.to_vec()));
            } else if !name.is_empty() {
                let text = field
                    .text()
                    .await
                    .map_err(|_| bad_request("Invalid multipart body"))?;
                data.insert(name, Value::String(text));
            }
        }
        Ok((data, image))
    } else {
        let bytes = axum::body::to_bytes(request.into_body(), MAX_JSON_BODY)
            .await
            .map_err(|_| bad_request("Invalid request body"))?;
        if bytes.is_empty() {
            return Ok((Record::new(), None));
        }
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|_| bad_request("Invalid request body"))?;
        let Value::Object(data) = value else {
            return Err(bad_request("Invalid request body"));
        };
        Ok((data, None))
    }
}

// ==================== Public Handlers ====================

async fn health() -> &'static str {
    "OK"
}

async fn public_events(
    State(state): State<AppState>,
    Extension(lang): Extension<RequestLang>,
    Query(params): Query<ListParams>,
) -> Response {
    list_response(&state, "events", params, Some(lang.0), false)
}

async fn home_events(
    State(state): State<AppState>,
    Extension(lang): Extension<RequestLang>,
) -> Response {
    let resource = state.resource("events");
    match resources::event::home_page_events(&resource, &state.db, Some(&lang.0)) {
        Ok(events) => Json(events).into_response(),
        Err(err) => failure_response(err),
    }
}

async fn public_messages(
    State(state): State<AppState>,
    Extension(lang): Extension<RequestLang>,
    Query(params): Query<ListParams>,
) -> Response {
    list_response(&state, "messages", params, Some(lang.0), false)
}

async fn public_geocaches(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    list_response(&state, "geocaches", params, None, false)
}

async fn public_languages(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    list_response(&state, "languages", params, None, false)
}

async fn public_static(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    list_response(&state, "static", params, None, false)
}

async fn public_socials(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    list_response(&state, "socials", params, None, false)
}

async fn create_contact_response(State(state): State<AppState>, request: Request) -> Response {
    create_response(&state, "contact_form_responses", request).await
}

async fn serve_image(
    State(state): State<AppState>,
    Path((dir, filename)): Path<(String, String)>,
) -> Response {
    let Some(path) = state.images.resolve(&dir, &filename) else {
        return image_not_found();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = content_type_for(&filename);
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(_) => image_not_found(),
    }
}

fn image_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "File not found"})),
    )
        .into_response()
}

fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

// ==================== Admin Handlers ====================

async fn admin_events(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    list_response(&state, "events", params, None, true)
}

async fn admin_get_event(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    get_response(&state, "events", &id)
}

async fn create_event(State(state): State<AppState>, request: Request) -> Response {
    create_response(&state, "events", request).await
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Response {
    update_response(&state, "events", &id, request).await
}

async fn delete_event(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    delete_response(&state, "events", &id)
}

async fn admin_geocaches(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    list_response(&state, "geocaches", params, None, true)
}

async fn admin_get_geocache(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    get_response(&state, "geocaches", &id)
}

async fn create_geocache(State(state): State<AppState>, request: Request) -> Response {
    create_response(&state, "geocaches", request).await
}

async fn update_geocache(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Response {
    update_response(&state, "geocaches", &id, request).await
}

async fn delete_geocache(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    delete_response(&state, "geocaches", &id)
}

async fn admin_messages(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    list_response(&state, "messages", params, None, true)
}

async fn admin_get_message(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    get_response(&state, "messages", &id)
}

async fn create_message(State(state): State<AppState>, request: Request) -> Response {
    create_response(&state, "messages", request).await
}

async fn update_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Response {
    update_response(&state, "messages", &id, request).await
}

async fn delete_message(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    delete_response(&state, "messages", &id)
}

async fn admin_languages(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    list_response(&state, "languages", params, None, true)
}

async fn create_language(State(state): State<AppState>, request: Request) -> Response {
    create_response(&state, "languages", request).await
}

async fn update_language(
    State(state): State<AppState>,
    Path(code): Path<String>,
    request: Request,
) -> Response {
    update_response(&state, "languages", &code, request).await
}

async fn delete_language(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    delete_response(&state, "languages", &code)
}

async fn admin_static(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    list_response(&state, "static", params, None, true)
}

async fn create_static(State(state): State<AppState>, request: Request) -> Response {
    create_response(&state, "static", request).await
}

async fn update_static(
    State(state): State<AppState>,
    Path(property): Path<String>,
    request: Request,
) -> Response {
    update_response(&state, "static", &property, request).await
}

async fn delete_static(State(state): State<AppState>, Path(property): Path<String>) -> Response {
    delete_response(&state, "static", &property)
}

async fn admin_socials(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    list_response(&state, "socials", params, None, true)
}

async fn create_social(State(state): State<AppState>, request: Request) -> Response {
    create_response(&state, "socials", request).await
}

async fn update_social(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Response {
    update_response(&state, "socials", &id, request).await
}

async fn delete_social(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    delete_response(&state, "socials", &id)
}

async fn admin_contact_responses(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    list_response(&state, "contact_form_responses", params, None, true)
}
