use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;
use tower::ServiceExt;

use campaign_search::server::{router, AppState};
use campaign_search::{DocumentType, SearchDocument, SearchOptions, SearchService};

fn seeded_state(snapshot_path: impl Into<std::path::PathBuf>) -> AppState {
    let mut service = SearchService::new(SearchOptions::default());
    service.add_document(SearchDocument::new(
        "n1",
        DocumentType::Npc,
        "Gregor",
        "Gregor the Blacksmith lives in Ironhold",
    ));
    service.add_document(SearchDocument::new(
        "l1",
        DocumentType::Location,
        "Ironhold",
        "A dwarven fortress city",
    ));
    AppState::new(service, snapshot_path)
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn get(uri: &str) -> Result<Request<Body>> {
    Ok(Request::builder().uri(uri).body(Body::empty())?)
}

#[tokio::test]
async fn test_health_reports_document_count() -> Result<()> {
    let app = router(seeded_state("unused.json"));

    let (status, body) = send(&app, get("/api/health")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["documents"], 2);
    Ok(())
}

#[tokio::test]
async fn test_search_endpoint() -> Result<()> {
    let app = router(seeded_state("unused.json"));

    let (status, body) = send(&app, get("/api/search?q=ironhold")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "ironhold");
    assert_eq!(body["total"], 2);
    assert_eq!(body["results"][0]["type"], "npc");
    assert_eq!(body["results"][1]["id"], "l1");
    assert!(body.get("groups").is_none());
    assert!(body["results"][0].get("score").is_none(), "Scores stay internal");

    let (_, body) = send(&app, get("/api/search?q=ironhold&grouped=true")?).await?;
    assert_eq!(body["groups"][0]["type"], "npc");
    assert_eq!(body["groups"][1]["type"], "location");
    assert_eq!(body["total"], 2);

    // Missing or short queries are not errors
    let (status, body) = send(&app, get("/api/search")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    let (_, body) = send(&app, get("/api/search?q=i")?).await?;
    assert_eq!(body["total"], 0);

    Ok(())
}

#[tokio::test]
async fn test_add_and_remove_documents() -> Result<()> {
    let app = router(seeded_state("unused.json"));

    let document = json!({
        "id": "q1",
        "type": "quest",
        "content": "Deliver the anvil to Ironhold",
        "metadata": { "title": "Heavy Cargo", "status": "active" }
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/documents")
        .header("content-type", "application/json")
        .body(Body::from(document.to_string()))?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&app, get("/api/search?q=anvil")?).await?;
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["title"], "Heavy Cargo");

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/documents/quest/q1")
        .body(Body::empty())?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, get("/api/search?q=anvil")?).await?;
    assert_eq!(body["total"], 0);

    // Removing something that is not there is fine
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/documents/npc/missing")
        .body(Body::empty())?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn test_reindex_from_snapshot() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let snapshot_path = temp_dir.path().join("campaign.json");
    fs::write(
        &snapshot_path,
        json!({
            "quests": [
                { "id": "q1", "title": "Lost Tome", "description": "Find the tome in the crypt" },
                { "id": "q2", "title": "Crypt Cleanup", "description": "Clear the undead" }
            ]
        })
        .to_string(),
    )?;

    let state = seeded_state(&snapshot_path);
    let app = router(state.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/reindex")
        .body(Body::empty())?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents"], 2);

    // Seeded documents were replaced by the snapshot
    assert!(state.service().read().await.search("gregor").is_empty());

    let (_, body) = send(&app, get("/api/search?q=crypt")?).await?;
    assert_eq!(body["results"][0]["id"], "q2", "Title hit ranks first");
    assert_eq!(body["results"][1]["id"], "q1");

    Ok(())
}

#[tokio::test]
async fn test_failed_reindex_keeps_old_index() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let state = seeded_state(temp_dir.path().join("missing.json"));
    let app = router(state.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/reindex")
        .body(Body::empty())?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(state.service().read().await.document_count(), 2);

    Ok(())
}
