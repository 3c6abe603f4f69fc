//! Integration tests for the skill upload/read endpoints.

mod common;

use axum::http::StatusCode;
use common::{sample_skill_markdown, TestApp};
use sandbox_core::Skill;

#[tokio::test]
async fn upload_skill_parses_and_persists() {
    let app = TestApp::new().await;
    let req = TestApp::post_markdown("/api/skills", sample_skill_markdown());
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::CREATED);
    let skill: Skill = TestApp::parse_json(&body);
    assert_eq!(skill.name, "Weather Lookup");
}

#[tokio::test]
async fn upload_skill_rejects_empty_body() {
    let app = TestApp::new().await;
    let req = TestApp::post_markdown("/api/skills", "   ");
    let (status, _body) = app.request(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_skill_after_upload_round_trips() {
    let app = TestApp::new().await;
    let upload = TestApp::post_markdown("/api/skills", sample_skill_markdown());
    let (_status, body) = app.request(upload).await;
    let created: Skill = TestApp::parse_json(&body);

    let req = TestApp::get_request(&format!("/api/skills/{}", created.id));
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::OK);
    let fetched: Skill = TestApp::parse_json(&body);
    assert_eq!(fetched.id, created.id);
}

#[tokio::test]
async fn get_skill_unknown_id_is_404() {
    let app = TestApp::new().await;
    let req = TestApp::get_request(&format!("/api/skills/{}", uuid::Uuid::new_v4()));
    let (status, _body) = app.request(req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_skills_includes_uploaded() {
    let app = TestApp::new().await;
    app.request(TestApp::post_markdown("/api/skills", sample_skill_markdown())).await;

    let req = TestApp::get_request("/api/skills");
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::OK);
    let skills: Vec<Skill> = TestApp::parse_json(&body);
    assert_eq!(skills.len(), 1);
}
