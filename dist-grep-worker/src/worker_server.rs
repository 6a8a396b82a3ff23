use std::time::Instant;

use axum::{
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::post,
  Json, Router,
};
use dist_grep_core::{
  grep::run_map,
  wire::{ErrorBody, MapRequest, MAP_ROUTE},
};
use tracing::{error, info, warn};

pub fn router() -> Router {
  Router::new().route(MAP_ROUTE, post(map))
}

fn error_response(status: StatusCode, error: String) -> Response {
  (status, Json(ErrorBody { error })).into_response()
}

async fn map(payload: Result<Json<MapRequest>, JsonRejection>) -> Response {
  let start = Instant::now();

  let Json(request) = match payload {
    Ok(request) => request,
    Err(rejection) => {
      warn!("Error decoding request: {}", rejection.body_text());
      return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
    }
  };

  match run_map(&request).await {
    Ok(response) => {
      info!(
        "/map finished in {:?} for file={}",
        start.elapsed(),
        request.path
      );
      Json(response).into_response()
    }
    Err(err) => {
      error!("Map error: {}", err);
      error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use dist_grep_core::{wire::MapResponse, KeyValue};
  use tempfile::TempDir;
  use tokio::net::TcpListener;

  async fn start_worker() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, router()).await.unwrap();
    });
    format!("http://{}{}", address, MAP_ROUTE)
  }

  async fn post_map(url: &str, pattern: &str, path: &str) -> reqwest::Response {
    reqwest::Client::new()
      .post(url)
      .json(&MapRequest {
        pattern: pattern.to_string(),
        path: path.to_string(),
      })
      .send()
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn test_map_returns_matching_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.log");
    std::fs::write(&path, "INFO start\nERROR disk full\nINFO end\n").unwrap();
    let path = path.to_str().unwrap();
    let url = start_worker().await;

    let response = post_map(&url, "ERROR", path).await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: MapResponse = response.json().await.unwrap();
    assert_eq!(
      body.kvs,
      vec![KeyValue::new(format!("{}:2", path), "ERROR disk full")]
    );
  }

  #[tokio::test]
  async fn test_map_on_empty_file_returns_empty_list() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.txt");
    std::fs::write(&path, "").unwrap();
    let url = start_worker().await;

    let response = post_map(&url, "x", path.to_str().unwrap()).await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "kvs": [] }));
  }

  #[tokio::test]
  async fn test_invalid_pattern_is_a_500() {
    let url = start_worker().await;

    let response = post_map(&url, "(", "/tmp/whatever").await;

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = response.json().await.unwrap();
    assert!(body.error.starts_with("invalid regex pattern"));
  }

  #[tokio::test]
  async fn test_missing_file_is_a_500() {
    let dir = TempDir::new().unwrap();
    let url = start_worker().await;

    let response = post_map(&url, "x", dir.path().join("gone.txt").to_str().unwrap()).await;

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = response.json().await.unwrap();
    assert!(body.error.starts_with("error opening file"));
  }

  #[tokio::test]
  async fn test_malformed_body_is_a_400() {
    let url = start_worker().await;

    let response = reqwest::Client::new()
      .post(&url)
      .header("content-type", "application/json")
      .body(r#"{"pattern": 1}"#)
      .send()
      .await
      .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
  }
}
