use seating_backend::{
    api::router::create_router,
    state::AppState,
    config::Config,
    infra::{
        factory::build_state,
        repositories::{sqlite_event_repo::SqliteEventRepo, sqlite_guest_repo::SqliteGuestRepo},
    },
};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, header},
    response::Response,
    Router,
};
use std::str::FromStr;
use rust_xlsxwriter::Workbook;
use tower::ServiceExt;
use serde_json::{json, Value};

pub const ADMIN_TOKEN: &str = "test_admin_token";
const BOUNDARY: &str = "----seating-test-boundary";

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub upload_dir: String,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::with_rate_limit(10_000).await
    }

    pub async fn with_rate_limit(rate_limit_per_minute: u32) -> Self {
        let id = Uuid::new_v4();
        let db_filename = format!("test_{}.db", id);
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);
        let upload_dir = format!("test_uploads_{}", id);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            admin_token: ADMIN_TOKEN.to_string(),
            allow_origins: vec!["http://localhost:3000".to_string()],
            max_upload_size: 10 * 1024 * 1024,
            rate_limit_per_minute,
            upload_dir: upload_dir.clone(),
        };

        let state = Arc::new(build_state(
            &config,
            Arc::new(SqliteEventRepo::new(pool.clone())),
            Arc::new(SqliteGuestRepo::new(pool.clone())),
        ));

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            upload_dir,
            state,
        }
    }

    /// Serves the router on an ephemeral local port, for clients that need a
    /// real connection (sockets). Returns the bound address.
    pub async fn serve(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });
        addr
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn admin_get(&self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
                .body(Body::empty())
                .unwrap(),
        ).await
    }

    pub async fn admin_json(&self, method: &str, uri: &str, payload: Value) -> Response {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        ).await
    }

    pub async fn public_json(&self, uri: &str, payload: Value) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        ).await
    }

    /// Creates an event through the API and returns its JSON.
    pub async fn create_event(&self, name: &str) -> Value {
        let response = self.admin_json(
            "POST",
            "/api/v1/admin/events",
            json!({
                "name": name,
                "date": "2026-09-12T16:00:00Z",
                "organizer_email": "planner@example.com"
            }),
        ).await;
        assert_eq!(response.status(), 201);
        parse_body(response).await
    }

    pub async fn upload(&self, event_id: &str, filename: &str, content: Vec<u8>) -> Response {
        let body = multipart_body(&[], Some((filename, content)));
        self.send(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/admin/events/{}/upload", event_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
                .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
                .body(Body::from(body))
                .unwrap(),
        ).await
    }

    pub async fn create_event_with_excel(&self, fields: &[(&str, &str)], file: Option<(&str, Vec<u8>)>) -> Response {
        let body = multipart_body(fields, file);
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/admin/create-event-with-excel")
                .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
                .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
                .body(Body::from(body))
                .unwrap(),
        ).await
    }

    /// Event with the given rows already imported. Returns the event JSON.
    pub async fn seeded_event(&self, rows: &[(&str, &str, f64, &str)]) -> Value {
        let event = self.create_event("Seeded Wedding").await;
        let response = self.upload(event["id"].as_str().unwrap(), "guests.xlsx", guest_workbook(rows)).await;
        assert_eq!(response.status(), 200);
        event
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

#[allow(dead_code)]
pub async fn parse_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, Vec<u8>)>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ).as_bytes());
    }
    if let Some((filename, content)) = file {
        body.extend_from_slice(format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, filename
        ).as_bytes());
        body.extend_from_slice(&content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Workbook with the standard headers and one row per guest.
#[allow(dead_code)]
pub fn guest_workbook(rows: &[(&str, &str, f64, &str)]) -> Vec<u8> {
    workbook_with_headers(&["Name", "Table", "Seat No.", "Dietary Preference"], rows)
}

#[allow(dead_code)]
pub fn workbook_with_headers(headers: &[&str], rows: &[(&str, &str, f64, &str)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, h) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *h).unwrap();
    }
    for (i, (name, table, seat, dietary)) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, *name).unwrap();
        sheet.write_string(r, 1, *table).unwrap();
        sheet.write_number(r, 2, *seat).unwrap();
        sheet.write_string(r, 3, *dietary).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}
