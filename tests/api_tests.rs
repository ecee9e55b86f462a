//! End-to-end API tests.
//!
//! Each test spins up the full router on an ephemeral port with a fresh
//! temporary database and drives it over HTTP, covering the public and
//! admin surfaces, the language gate and image round-trips.

use geoclub_cms::{config::Config, db::Database, server, service::ImageStore};
use serde_json::{json, Value};
use tempfile::TempDir;

const ADMIN_TOKEN: &str = "test-admin-token";

struct TestApp {
    base_url: String,
    client: reqwest::Client,
    _temp_dir: TempDir,
}

impl TestApp {
    /// Start the server on an ephemeral port with a fresh database seeded
    /// with NL (default) and EN.
    async fn spawn() -> TestApp {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("cms.db");
        let images_dir = temp_dir.path().join("images");

        let config = Config {
            port: 0,
            admin_api_token: ADMIN_TOKEN.to_string(),
            database_path: db_path.to_str().unwrap().to_string(),
            images_dir: images_dir.to_str().unwrap().to_string(),
            default_language: "NL".to_string(),
        };

        let db = Database::new(&config.database_path, &config.default_language)
            .expect("Failed to create database");
        {
            let conn = db.lock();
            conn.execute(
                "INSERT INTO languages (code, name, created_at, updated_at)
                 VALUES ('EN', 'English', '2024-01-01', '2024-01-01')",
                [],
            )
            .expect("Failed to seed EN");
        }
        let images = ImageStore::new(&config.images_dir);

        let state = server::AppState::new(config, db, images);
        let app = server::router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server error");
        });

        TestApp {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.expect("GET")
    }

    async fn admin_get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .send()
            .await
            .expect("GET")
    }

    async fn admin_post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .json(body)
            .send()
            .await
            .expect("POST")
    }

    async fn admin_put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .json(body)
            .send()
            .await
            .expect("PUT")
    }

    async fn admin_delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .send()
            .await
            .expect("DELETE")
    }
}

fn event_body() -> Value {
    json!({
        "state": "ONLINE",
        "title": "Spring CITO",
        "geolink": "https://www.geocaching.com/geocache/GCXXXX",
        "type": "CITO",
        "start_date": "2025-04-01 10:00:00",
        "end_date": "2025-04-01 14:00:00"
    })
}

// ==================== Health ====================

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.expect("body"), "OK");
}

// ==================== Auth Gate ====================

#[tokio::test]
async fn test_admin_routes_require_bearer_token() {
    let app = TestApp::spawn().await;

    let response = app.get("/admin/events").await;
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["error"], "access denied");
}

#[tokio::test]
async fn test_admin_routes_reject_wrong_token() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/admin/events"))
        .bearer_auth("wrong-token")
        .send()
        .await
        .expect("GET");
    assert_eq!(response.status().as_u16(), 401);
}

// ==================== Language Gate ====================

#[tokio::test]
async fn test_unknown_language_rejected_with_404() {
    let app = TestApp::spawn().await;

    let response = app.get("/events?lang=XX").await;
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["error"], "Language code: \"XX\" is not supported");
}

#[tokio::test]
async fn test_language_gate_accepts_known_and_default() {
    let app = TestApp::spawn().await;

    assert_eq!(app.get("/events?lang=NL").await.status().as_u16(), 200);
    assert_eq!(app.get("/events?lang=en").await.status().as_u16(), 200);
    // Absent lang falls back to the configured default
    assert_eq!(app.get("/events").await.status().as_u16(), 200);
    assert_eq!(app.get("/messages").await.status().as_u16(), 200);
    assert_eq!(app.get("/home_events").await.status().as_u16(), 200);
}

// ==================== Event Flows ====================

#[tokio::test]
async fn test_event_public_hides_id_admin_shows_it() {
    let app = TestApp::spawn().await;

    let created = app.admin_post("/admin/events", &event_body()).await;
    assert_eq!(created.status().as_u16(), 200);
    let created: Value = created.json().await.expect("json");
    assert!(created["data"]["id"].is_i64(), "create returns admin view");

    let public: Value = app
        .get("/events?lang=NL")
        .await
        .json()
        .await
        .expect("json");
    let entity = &public["data"][0];
    assert_eq!(entity["title"], "Spring CITO");
    assert_eq!(
        entity["geolink"],
        "https://www.geocaching.com/geocache/GCXXXX"
    );
    assert_eq!(entity["type"], "CITO");
    assert!(entity["id"].is_null(), "public output must not carry id");
    assert!(entity["state"].is_null(), "state is admin-only");

    let admin: Value = app.admin_get("/admin/events").await.json().await.expect("json");
    assert!(admin["data"][0]["id"].is_i64());
    assert_eq!(admin["data"][0]["state"], "ONLINE");
}

#[tokio::test]
async fn test_event_validation_errors_returned_as_map() {
    let app = TestApp::spawn().await;

    let response = app
        .admin_post(
            "/admin/events",
            &json!({
                "state": "PUBLISHED",
                "geolink": "https://elsewhere.example/GC1",
                "type": "CITO",
                "start_date": "2025-04-01 10:00:00",
                "end_date": "2025-04-01 14:00:00"
            }),
        )
        .await;

    // Validation failures keep the observed 200-with-errors contract
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("json");
    assert!(body["errors"]["state"].is_array());
    assert!(body["errors"]["title"].is_array());
    assert!(body["errors"]["geolink"].is_array());
    assert!(body["data"].is_null());

    let admin: Value = app.admin_get("/admin/events").await.json().await.expect("json");
    assert_eq!(admin["total"], 0, "nothing persisted");
}

#[tokio::test]
async fn test_event_update_and_translations_roundtrip() {
    let app = TestApp::spawn().await;

    let mut body = event_body();
    body["translations"] = json!([
        {"lang_code": "NL", "description": "Lenteschoonmaak"},
        {"lang_code": "EN", "description": "Spring cleanup"}
    ]);
    let created: Value = app
        .admin_post("/admin/events", &body)
        .await
        .json()
        .await
        .expect("json");
    let id = created["data"]["id"].as_i64().expect("id");

    // Public NL view carries only the NL translation
    let public: Value = app
        .get("/events?lang=NL")
        .await
        .json()
        .await
        .expect("json");
    let translations = public["data"][0]["translations"].as_array().expect("array");
    assert_eq!(translations.len(), 1);
    assert_eq!(translations[0]["lang_code"], "NL");

    // Update the title and one translation; the other language survives
    let mut changed = event_body();
    changed["title"] = json!("Autumn CITO");
    changed["translations"] = json!([{"lang_code": "NL", "description": "Herfstschoonmaak"}]);
    let updated: Value = app
        .admin_put(&format!("/admin/events/{}", id), &changed)
        .await
        .json()
        .await
        .expect("json");

    assert_eq!(updated["data"]["title"], "Autumn CITO");
    let translations = updated["data"]["translations"].as_array().expect("array");
    assert_eq!(translations.len(), 2);
    assert_eq!(translations[0]["lang_code"], "EN");
    assert_eq!(translations[0]["description"], "Spring cleanup");
    assert_eq!(translations[1]["description"], "Herfstschoonmaak");
}

#[tokio::test]
async fn test_event_update_unknown_id_reports_not_found() {
    let app = TestApp::spawn().await;

    let response = app.admin_put("/admin/events/999", &event_body()).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("json");
    assert!(body["errors"]["item_not_found"].is_array());
}

#[tokio::test]
async fn test_event_delete_flow() {
    let app = TestApp::spawn().await;

    let created: Value = app
        .admin_post("/admin/events", &event_body())
        .await
        .json()
        .await
        .expect("json");
    let id = created["data"]["id"].as_i64().expect("id");

    let deleted: Value = app
        .admin_delete(&format!("/admin/events/{}", id))
        .await
        .json()
        .await
        .expect("json");
    assert_eq!(deleted["deleted"], true);

    let response = app.admin_get(&format!("/admin/events/{}", id)).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_draft_events_only_visible_to_admin() {
    let app = TestApp::spawn().await;

    let mut draft = event_body();
    draft["state"] = json!("DRAFT");
    app.admin_post("/admin/events", &draft).await;

    let public: Value = app
        .get("/events?lang=NL")
        .await
        .json()
        .await
        .expect("json");
    assert_eq!(public["total"], 0);

    let admin: Value = app.admin_get("/admin/events").await.json().await.expect("json");
    assert_eq!(admin["total"], 1);
}

#[tokio::test]
async fn test_home_events_restricted_to_pinned_online() {
    let app = TestApp::spawn().await;

    let mut pinned = event_body();
    pinned["on_home"] = json!("true");
    app.admin_post("/admin/events", &pinned).await;

    let mut draft = event_body();
    draft["on_home"] = json!("true");
    draft["state"] = json!("DRAFT");
    draft["title"] = json!("Hidden");
    app.admin_post("/admin/events", &draft).await;

    app.admin_post("/admin/events", &event_body()).await;

    let home: Value = app.get("/home_events").await.json().await.expect("json");
    let home = home.as_array().expect("bare array");
    assert_eq!(home.len(), 1);
    assert_eq!(home[0]["title"], "Spring CITO");
}

// ==================== Languages ====================

#[tokio::test]
async fn test_language_crud_and_default_guard() {
    let app = TestApp::spawn().await;

    // Public list is a bare array (unpaginated resource)
    let languages: Value = app.get("/languages").await.json().await.expect("json");
    let languages = languages.as_array().expect("bare array");
    assert_eq!(languages.len(), 2);

    let created: Value = app
        .admin_post("/admin/languages", &json!({"code": "FR", "name": "Français"}))
        .await
        .json()
        .await
        .expect("json");
    assert_eq!(created["data"]["code"], "FR");

    // The default language is undeletable, deterministically
    let rejected: Value = app
        .admin_delete("/admin/languages/NL")
        .await
        .json()
        .await
        .expect("json");
    assert_eq!(
        rejected["errors"]["code"][0],
        "The default language cannot be deleted."
    );
    let languages: Value = app.get("/languages").await.json().await.expect("json");
    assert_eq!(languages.as_array().unwrap().len(), 3, "NL still present");

    // Other languages delete normally
    let deleted: Value = app
        .admin_delete("/admin/languages/FR")
        .await
        .json()
        .await
        .expect("json");
    assert_eq!(deleted["deleted"], true);
}

#[tokio::test]
async fn test_language_flag_upload_roundtrip() {
    let app = TestApp::spawn().await;

    let flag_bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];
    let form = reqwest::multipart::Form::new()
        .text("code", "DE")
        .text("name", "Deutsch")
        .part(
            "image",
            reqwest::multipart::Part::bytes(flag_bytes.clone()).file_name("flag.png"),
        );

    let created: Value = app
        .client
        .post(app.url("/admin/languages"))
        .bearer_auth(ADMIN_TOKEN)
        .multipart(form)
        .send()
        .await
        .expect("POST")
        .json()
        .await
        .expect("json");

    // Flags are named after the language code
    assert_eq!(created["data"]["image_url"], "/images/langFlags/DE.png");

    let image = app.get("/images/langFlags/DE.png").await;
    assert_eq!(image.status().as_u16(), 200);
    assert_eq!(
        image.headers()["content-type"].to_str().unwrap(),
        "image/png"
    );
    let served = image.bytes().await.expect("bytes");
    assert_eq!(served.to_vec(), flag_bytes);
}

#[tokio::test]
async fn test_missing_image_reports_not_found() {
    let app = TestApp::spawn().await;

    let response = app.get("/images/langFlags/missing.png").await;
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["error"], "File not found");
}

// ==================== Messages ====================

#[tokio::test]
async fn test_message_translations_as_json_string() {
    let app = TestApp::spawn().await;

    // Multipart clients send translations as a JSON-encoded string
    let created = app
        .admin_post(
            "/admin/messages",
            &json!({
                "state": "ONLINE",
                "translations": "[{\"lang_code\": \"NL\", \"title\": \"Hallo\", \"body\": \"Welkom\"}]"
            }),
        )
        .await;
    assert_eq!(created.status().as_u16(), 200);
    let created: Value = created.json().await.expect("json");
    assert!(created["data"]["id"].is_i64());

    let public: Value = app
        .get("/messages?lang=NL")
        .await
        .json()
        .await
        .expect("json");
    assert_eq!(public["data"][0]["translations"][0]["title"], "Hallo");
}

#[tokio::test]
async fn test_message_malformed_translations_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .admin_post(
            "/admin/messages",
            &json!({"state": "ONLINE", "translations": "{not json"}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("json");
    assert!(body["errors"]["translations"].is_array());

    let admin: Value = app
        .admin_get("/admin/messages")
        .await
        .json()
        .await
        .expect("json");
    assert_eq!(admin["total"], 0);
}

// ==================== Static Content ====================

#[tokio::test]
async fn test_static_content_returns_all_languages() {
    let app = TestApp::spawn().await;

    app.admin_post(
        "/admin/static",
        &json!({
            "property": "back",
            "contents": [
                {"lang_code": "NL", "content": "terug"},
                {"lang_code": "EN", "content": "back"}
            ]
        }),
    )
    .await;

    let all: Value = app.get("/static").await.json().await.expect("json");
    let all = all.as_array().expect("bare array");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["property"], "back");
    assert_eq!(
        all[0]["contents"].as_array().unwrap().len(),
        2,
        "every language in one fetch"
    );
}

// ==================== Contact Form ====================

#[tokio::test]
async fn test_contact_form_public_create_and_admin_list() {
    let app = TestApp::spawn().await;

    let created = app
        .client
        .post(app.url("/contact/form/responses"))
        .json(&json!({
            "email": "cacher@club.be",
            "subject": "Vraag over CITO",
            "message": "Wanneer is het volgende event?"
        }))
        .send()
        .await
        .expect("POST");
    assert_eq!(created.status().as_u16(), 200);
    let created: Value = created.json().await.expect("json");
    assert_eq!(created["data"]["email"], "cacher@club.be");

    let invalid = app
        .client
        .post(app.url("/contact/form/responses"))
        .json(&json!({"email": "nope", "subject": "x"}))
        .send()
        .await
        .expect("POST");
    let invalid: Value = invalid.json().await.expect("json");
    assert!(invalid["errors"]["email"].is_array());
    assert!(invalid["errors"]["message"].is_array());

    // Listing responses is admin-only
    let unauthorized = app.get("/admin/contact/form/responses").await;
    assert_eq!(unauthorized.status().as_u16(), 401);

    let admin: Value = app
        .admin_get("/admin/contact/form/responses")
        .await
        .json()
        .await
        .expect("json");
    assert_eq!(admin["total"], 1);
    assert_eq!(admin["data"][0]["subject"], "Vraag over CITO");
}

// ==================== Pagination & Search ====================

#[tokio::test]
async fn test_event_list_pagination_and_search() {
    let app = TestApp::spawn().await;

    for i in 0..12 {
        let mut body = event_body();
        body["title"] = json!(format!("Event {:02}", i));
        app.admin_post("/admin/events", &body).await;
    }

    let page: Value = app
        .admin_get("/admin/events?per_page=5&page=3")
        .await
        .json()
        .await
        .expect("json");
    assert_eq!(page["current_page"], 3);
    assert_eq!(page["per_page"], 5);
    assert_eq!(page["total"], 12);
    assert_eq!(page["last_page"], 3);
    assert_eq!(page["data"].as_array().unwrap().len(), 2);

    let searched: Value = app
        .admin_get("/admin/events?search=Event+07")
        .await
        .json()
        .await
        .expect("json");
    assert_eq!(searched["total"], 1);

    // Unknown sort columns fall back to the default instead of erroring
    let sorted = app.admin_get("/admin/events?sort_by=no_such_column").await;
    assert_eq!(sorted.status().as_u16(), 200);
}
