use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use survey_index::{SurveyError, SurveyIndex};
use tower_http::cors::CorsLayer;

pub(crate) fn router(index: Arc<SurveyIndex>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/list", get(list_surveys))
        .route("/update", get(update_surveys))
        .route("/survey", get(get_survey))
        .with_state(index)
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Deserialize)]
pub(crate) struct SurveyQuery {
    #[serde(default)]
    id: String,
}

async fn status() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

async fn list_surveys(State(index): State<Arc<SurveyIndex>>) -> Response {
    Json(index.list()).into_response()
}

async fn update_surveys(State(index): State<Arc<SurveyIndex>>) -> Response {
    let message = match tokio::task::spawn_blocking(move || index.rebuild()).await {
        Ok(Ok(stats)) => {
            return Json(json!({ "ok": true, "surveys": stats.surveys })).into_response();
        }
        Ok(Err(err)) => err.to_string(),
        Err(err) => format!("rebuild task failed: {err}"),
    };

    log::error!("Survey rebuild failed: {message}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "ok": false, "error": message })),
    )
        .into_response()
}

async fn get_survey(
    State(index): State<Arc<SurveyIndex>>,
    Query(query): Query<SurveyQuery>,
) -> Response {
    let id = query.id;
    match tokio::task::spawn_blocking(move || index.fetch(&id)).await {
        Ok(Ok(bytes)) => {
            (StatusCode::OK, [(CONTENT_TYPE, "application/json")], bytes).into_response()
        }
        Ok(Err(err @ SurveyError::NotFound { .. })) => not_found("Unknown file", &err),
        Ok(Err(err)) => not_found("Unable to read file", &err),
        Err(err) => {
            log::error!("Survey fetch task failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "msg": "Unable to read file", "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

fn not_found(msg: &str, err: &SurveyError) -> Response {
    log::debug!("{msg}: {err}");
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "msg": msg, "error": err.to_string() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn write_survey(root: &Path, relative: &str, key: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            path,
            format!(r#"{{"surveyDefinition": {{"key": "{key}"}}, "metadata": {{"a": "b"}}}}"#),
        )
        .unwrap();
    }

    fn built_index(temp: &TempDir) -> Arc<SurveyIndex> {
        let index = SurveyIndex::new(temp.path()).unwrap();
        index.rebuild().unwrap();
        Arc::new(index)
    }

    #[tokio::test]
    async fn list_returns_sorted_entries() {
        let temp = TempDir::new().unwrap();
        write_survey(temp.path(), "b/def/s.json", "B");
        write_survey(temp.path(), "a/def/s.json", "A");
        let index = built_index(&temp);

        let response = list_surveys(State(index)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a/def/s.json", "b/def/s.json"]);
        assert_eq!(body[0]["label"], "A");
        assert_eq!(body[0]["study"], "a");
        assert_eq!(body[0]["metadata"]["a"], "b");
    }

    #[tokio::test]
    async fn survey_streams_raw_document() {
        let temp = TempDir::new().unwrap();
        write_survey(temp.path(), "a/def/s.json", "A");
        let index = built_index(&temp);

        let response = get_survey(
            State(index),
            Query(SurveyQuery {
                id: "a/def/s.json".into(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let body = body_json(response).await;
        assert_eq!(body["surveyDefinition"]["key"], "A");
    }

    #[tokio::test]
    async fn unknown_and_vanished_surveys_are_not_found() {
        let temp = TempDir::new().unwrap();
        write_survey(temp.path(), "a/def/s.json", "A");
        let index = built_index(&temp);

        let response = get_survey(
            State(index.clone()),
            Query(SurveyQuery {
                id: "nonexistent".into(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["msg"], "Unknown file");
        assert!(body["error"].as_str().unwrap().contains("nonexistent"));

        std::fs::remove_file(temp.path().join("a/def/s.json")).unwrap();
        let response = get_survey(
            State(index),
            Query(SurveyQuery {
                id: "a/def/s.json".into(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["msg"], "Unable to read file");
    }

    #[tokio::test]
    async fn update_reports_success_and_failure() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        write_survey(&root, "a/def/s.json", "A");
        let index = Arc::new(SurveyIndex::new(&root).unwrap());

        let response = update_surveys(State(index.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["surveys"], 1);

        std::fs::remove_dir_all(&root).unwrap();
        let response = update_surveys(State(index.clone())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["ok"], false);
        assert_eq!(index.list().len(), 1);
    }

    #[tokio::test]
    async fn status_is_ok() {
        let body = body_json(status().await).await;
        assert_eq!(body["status"], "ok");
    }
}
