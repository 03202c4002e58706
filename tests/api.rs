use actix_web::{http::StatusCode, test, web, App};
use portfolio_cms::config::{Config, WebConfig};
use portfolio_cms::models::db_operations::admins_db_operations;
use portfolio_cms::setup::db_setup;
use portfolio_cms::{routes, DbPool};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

const BOUNDARY: &str = "----portfolio-test-boundary";

struct TestEnv {
    _dir: TempDir,
    config: Config,
    pool: DbPool,
}

fn test_env() -> TestEnv {
    let dir = TempDir::new().unwrap();
    let upload_dir = dir.path().join("uploads");
    std::fs::create_dir_all(&upload_dir).unwrap();
    let config = Config {
        web: WebConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database_url: dir.path().join("cms.db").to_string_lossy().to_string(),
        upload_dir: upload_dir.to_string_lossy().to_string(),
        public_sync_dir: None,
        node_env: "test".into(),
        allowed_origins: "*".into(),
        log_level: "warn".into(),
        max_file_size: 10 * 1024 * 1024,
        token_ttl_hours: 2,
    };
    let pool = db_setup::create_pool(&config.database_path()).unwrap();
    {
        let mut conn = pool.get().unwrap();
        db_setup::setup_database(&mut conn).unwrap();
        admins_db_operations::create_admin(&conn, "owner", "secret-pw").unwrap();
    }
    TestEnv {
        _dir: dir,
        config,
        pool,
    }
}

macro_rules! app {
    ($env:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($env.config.clone()))
                .app_data(web::Data::new($env.pool.clone()))
                .configure(routes::config_api)
                .default_service(web::to(routes::not_found)),
        )
        .await
    };
}

macro_rules! login {
    ($app:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": "owner", "password": "secret-pw" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        format!("Bearer {}", body["token"].as_str().unwrap())
    }};
}

fn project_body(title: &str) -> Value {
    json!({
        "title": title,
        "description": "A case study",
        "category": "WEBSITE",
        "thumbnail": "/uploads/thumb.webp",
        "images": "[\"/uploads/one.webp\"]",
        "year": 2023,
        "client": "ACME",
    })
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 3, image::Rgba([200, 40, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn file_part(field: &str, filename: &str, mime: &str, data: &[u8]) -> Vec<u8> {
    let mut part = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
        BOUNDARY, field, filename, mime
    )
    .into_bytes();
    part.extend_from_slice(data);
    part.extend_from_slice(b"\r\n");
    part
}

fn text_part(field: &str, data: &[u8]) -> Vec<u8> {
    let mut part = format!("--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n", BOUNDARY, field).into_bytes();
    part.extend_from_slice(data);
    part.extend_from_slice(b"\r\n");
    part
}

fn multipart(parts: &[Vec<u8>]) -> Vec<u8> {
    let mut body = parts.concat();
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_body(field: &str, filename: &str, mime: &str, data: &[u8]) -> Vec<u8> {
    multipart(&[file_part(field, filename, mime, data)])
}

fn upload_request(token: &str, body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/media")
        .insert_header(("Authorization", token.to_string()))
        .insert_header(("Content-Type", format!("multipart/form-data; boundary={}", BOUNDARY)))
        .set_payload(body)
}

fn stored_files(env: &TestEnv) -> usize {
    std::fs::read_dir(&env.config.upload_dir).unwrap().count()
}

fn template_body(title: &str) -> Value {
    json!({
        "title": title,
        "client": "ACME",
        "year": "2024",
        "type": "Branding",
        "scope": ["Strategy", "Identity"],
    })
}

#[actix_web::test]
async fn health_is_public() {
    let env = test_env();
    let app = app!(env);
    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "OK");

    let req = test::TestRequest::get().uri("/api/nowhere").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn mutations_require_a_token() {
    let env = test_env();
    let app = app!(env);
    let req = test::TestRequest::post()
        .uri("/api/projects")
        .set_json(project_body("No auth"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "owner", "password": "wrong" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn projects_are_appended_in_order() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);

    let mut orders = Vec::new();
    for title in ["First", "Second"] {
        let req = test::TestRequest::post()
            .uri("/api/projects")
            .insert_header(("Authorization", token.clone()))
            .set_json(project_body(title))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        orders.push(body["order"].as_i64().unwrap());
    }
    assert_eq!(orders, vec![0, 1]);

    let req = test::TestRequest::get().uri("/api/projects").to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list[0]["slug"], "first");
    assert_eq!(list[0]["imageUrl"], "/uploads/one.webp");
}

#[actix_web::test]
async fn invalid_images_field_is_rejected() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);

    let mut body = project_body("Broken");
    body["images"] = json!("not json");
    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(("Authorization", token))
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("images"));
}

#[actix_web::test]
async fn reorder_is_all_or_nothing() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(("Authorization", token.clone()))
        .set_json(project_body("Only"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri("/api/projects/reorder")
        .insert_header(("Authorization", token.clone()))
        .set_json(json!({ "projectOrders": [{ "id": id, "order": 5 }, { "id": "missing", "order": 6 }] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri(&format!("/api/projects/{}", id)).to_request();
    let project: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(project["order"], 0);

    let req = test::TestRequest::put()
        .uri("/api/projects/reorder")
        .insert_header(("Authorization", token))
        .set_json(json!({ "projectOrders": [{ "id": id, "order": 5 }] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn publishing_a_project() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(("Authorization", token.clone()))
        .set_json(project_body("Launch"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["isPublished"], false);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/projects/{}/publish", created["id"].as_str().unwrap()))
        .insert_header(("Authorization", token))
        .set_json(json!({ "isPublished": true }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Project published successfully");
    assert_eq!(body["project"]["isPublished"], true);

    let req = test::TestRequest::get()
        .uri("/api/projects?isPublished=true&format=full")
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["meta"]["total"], 1);
}

#[actix_web::test]
async fn image_upload_is_stored_as_webp() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);

    let req = test::TestRequest::post()
        .uri("/api/media")
        .insert_header(("Authorization", token.clone()))
        .insert_header(("Content-Type", format!("multipart/form-data; boundary={}", BOUNDARY)))
        .set_payload(multipart_body("file", "red dot.png", "image/png", &png_bytes()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let media: Value = test::read_body_json(resp).await;
    assert_eq!(media["mimeType"], "image/webp");
    assert_eq!(media["type"], "image");
    assert!(media["url"].as_str().unwrap().starts_with("/uploads/"));
    let filename = media["filename"].as_str().unwrap();
    assert!(Path::new(&env.config.upload_dir).join(filename).exists());

    // A file already gone from disk must not block deleting the record.
    std::fs::remove_file(Path::new(&env.config.upload_dir).join(filename)).unwrap();
    let req = test::TestRequest::delete()
        .uri(&format!("/api/media/{}", media["id"].as_str().unwrap()))
        .insert_header(("Authorization", token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Media file deleted successfully");
}

#[actix_web::test]
async fn unsupported_upload_type_is_rejected() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);

    let req = test::TestRequest::post()
        .uri("/api/media")
        .insert_header(("Authorization", token))
        .insert_header(("Content-Type", format!("multipart/form-data; boundary={}", BOUNDARY)))
        .set_payload(multipart_body("file", "run.sh", "application/x-sh", b"echo hi"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn social_links_are_validated_and_persisted() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);

    let req = test::TestRequest::get().uri("/api/profile").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri("/api/profile/social")
        .insert_header(("Authorization", token.clone()))
        .set_json(json!({ "linkedin": "not a url" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("linkedin"));

    let req = test::TestRequest::put()
        .uri("/api/profile/social")
        .insert_header(("Authorization", token))
        .set_json(json!({ "linkedin": "https://www.linkedin.com/in/someone" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["socialLinks"]["linkedin"], "https://www.linkedin.com/in/someone");

    let req = test::TestRequest::get().uri("/api/profile").to_request();
    let profile: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile["socialLinks"]["linkedin"], "https://www.linkedin.com/in/someone");
}

#[actix_web::test]
async fn titles_are_stored_as_plain_text() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(("Authorization", token.clone()))
        .set_json(project_body("Design & Build"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["title"], "Design & Build");
    let id = created["id"].as_str().unwrap().to_string();

    let body = project_body(created["title"].as_str().unwrap());
    let req = test::TestRequest::put()
        .uri(&format!("/api/projects/{}", id))
        .insert_header(("Authorization", token.clone()))
        .set_json(body)
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["title"], "Design & Build");

    let req = test::TestRequest::get().uri(&format!("/api/projects/{}", id)).to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["title"], "Design & Build");

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(("Authorization", token))
        .set_json(project_body("<b></b>"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("title"));
}

#[actix_web::test]
async fn non_string_images_name_the_field() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);

    for images in [json!(42), json!(["/uploads/one.webp"])] {
        let mut body = project_body("Typed");
        body["images"] = images;
        let req = test::TestRequest::post()
            .uri("/api/projects")
            .insert_header(("Authorization", token.clone()))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("images"));
    }
}

#[actix_web::test]
async fn update_rejects_invalid_images() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);

    let req = test::TestRequest::post()
        .uri("/api/projects")
        .insert_header(("Authorization", token.clone()))
        .set_json(project_body("Stable"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap().to_string();

    let mut body = project_body("Stable");
    body["images"] = json!("{\"not\": \"an array\"}");
    let req = test::TestRequest::put()
        .uri(&format!("/api/projects/{}", id))
        .insert_header(("Authorization", token))
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("images"));

    let req = test::TestRequest::get().uri(&format!("/api/projects/{}", id)).to_request();
    let project: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(project["images"], "[\"/uploads/one.webp\"]");
}

#[actix_web::test]
async fn failed_uploads_leave_no_files() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);
    let png = png_bytes();

    let bad_alt = multipart(&[file_part("file", "a.png", "image/png", &png), text_part("alt", &[0xff, 0xfe, 0xfd])]);
    let two_files = multipart(&[
        file_part("file", "a.png", "image/png", &png),
        file_part("file", "b.png", "image/png", &png),
    ]);
    let long_description = multipart(&[
        file_part("file", "a.png", "image/png", &png),
        text_part("description", &vec![b'x'; 64 * 1024 + 1]),
    ]);
    let mut truncated = file_part("file", "a.png", "image/png", &png);
    truncated.truncate(truncated.len() - 2);

    for body in [bad_alt, two_files, long_description, truncated] {
        let resp = test::call_service(&app, upload_request(&token, body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(stored_files(&env), 0);
    }

    let resp = test::call_service(&app, upload_request(&token, multipart_body("file", "a.png", "image/png", &png)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(stored_files(&env), 2);
}

#[actix_web::test]
async fn template_project_lifecycle() {
    let env = test_env();
    let app = app!(env);
    let token = login!(app);

    let req = test::TestRequest::post()
        .uri("/api/template-projects")
        .set_json(template_body("Case study"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/template-projects")
        .insert_header(("Authorization", token.clone()))
        .set_json(template_body("Case study"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "draft");
    assert!(created["publishedAt"].is_null());
    assert_eq!(created["scope"], json!(["Strategy", "Identity"]));
    let id = created["id"].as_str().unwrap().to_string();

    let set_status = |status: &str| {
        test::TestRequest::patch()
            .uri(&format!("/api/template-projects/{}/status", id))
            .insert_header(("Authorization", token.clone()))
            .set_json(json!({ "status": status }))
            .to_request()
    };

    let published: Value = test::call_and_read_body_json(&app, set_status("published")).await;
    assert_eq!(published["message"], "Template project published successfully");
    let first_published_at = published["project"]["publishedAt"].clone();
    assert!(first_published_at.is_string());

    let again: Value = test::call_and_read_body_json(&app, set_status("published")).await;
    assert_eq!(again["project"]["publishedAt"], first_published_at);
    let archived: Value = test::call_and_read_body_json(&app, set_status("archived")).await;
    assert_eq!(archived["project"]["status"], "archived");
    assert_eq!(archived["project"]["publishedAt"], first_published_at);

    let resp = test::call_service(&app, set_status("deleted")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri(&format!("/api/template-projects/{}/duplicate", id))
        .insert_header(("Authorization", token.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let duplicated: Value = test::read_body_json(resp).await;
    assert_eq!(duplicated["project"]["title"], "Case study (copy)");
    assert_eq!(duplicated["project"]["status"], "draft");
    assert!(duplicated["project"]["publishedAt"].is_null());

    let req = test::TestRequest::put()
        .uri(&format!("/api/template-projects/{}", id))
        .insert_header(("Authorization", token.clone()))
        .set_json(template_body("Renamed"))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["title"], "Renamed");

    let req = test::TestRequest::get()
        .uri("/api/template-projects?status=draft")
        .to_request();
    let drafts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(drafts["meta"]["total"], 2);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/template-projects/{}", id))
        .insert_header(("Authorization", token.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/template-projects/{}", id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
