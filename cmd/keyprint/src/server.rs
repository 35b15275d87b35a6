//! HTTP front end for typing capture and prediction.
//!
//! API endpoints:
//! - GET  /             - Static files, or a built-in page
//! - GET  /participants - {participants: [...]}
//! - GET  /sessions     - {sessions: [...]} for ?participant=
//! - GET  /history      - {history: [...]} for ?participant=&session=
//! - POST /predict      - classify and store a typing sample

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use keyprint::{Digraph, DnnLoader, DnnService, KeyprintError, flatten};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::store::{Row, TypingStore};

pub struct AppState {
    pub service: DnnService,
    pub store: TypingStore,
    /// Participants in class-index order.
    pub class_labels: Vec<String>,
}

type SharedState = Arc<AppState>;

/// JSON error body with an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<KeyprintError> for ApiError {
    fn from(err: KeyprintError) -> Self {
        let status = match &err {
            KeyprintError::NotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            e if e.is_input_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: format!("prediction failed: {err}"),
        }
    }
}

/// Loads the model and the dataset, then serves until the process exits.
/// A model that fails to load is logged; `/predict` answers 503 until a
/// model is available.
pub async fn serve(config: &Config) -> Result<()> {
    let service = DnnService::with_policy(DnnLoader::default(), config.load_policy);
    match service.load_model(&config.model_path) {
        Ok(()) => info!(path = %config.model_path.display(), "model loaded"),
        Err(e) => error!(error = %e, "model not loaded, predictions disabled"),
    }

    let store = TypingStore::new(config.base_csv_path(), config.ext_csv_path());
    if let Err(e) = store.bootstrap() {
        error!(error = %e, "dataset bootstrap failed, new samples cannot be saved");
    }
    let class_labels = store.class_labels();
    info!(
        base = %store.base_path().display(),
        ext = %store.ext_path().display(),
        classes = class_labels.len(),
        "dataset ready"
    );

    let state = Arc::new(AppState {
        service,
        store,
        class_labels,
    });
    let app = router(state, config.static_dir.clone());

    let addr = config.socket_addr()?;
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: SharedState, static_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route("/participants", get(list_participants))
        .route("/sessions", get(list_sessions))
        .route("/history", get(view_history))
        .route("/predict", post(predict))
        .with_state(state);

    match static_dir {
        Some(dir) if dir.exists() => {
            app = app.fallback_service(ServeDir::new(dir));
        }
        Some(dir) => {
            warn!(dir = %dir.display(), "static dir not found");
            app = app.route("/", get(fallback_index));
        }
        None => {
            app = app.route("/", get(fallback_index));
        }
    }
    app
}

async fn fallback_index() -> impl IntoResponse {
    Html(FALLBACK_HTML)
}

#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub participants: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub participant: String,
    #[serde(default)]
    pub session: String,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<Row>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PredictResponse {
    pub predicted_index: usize,
    /// The participant the sample was submitted for.
    pub predicted_user: String,
    /// Participant the predicted class maps to, if known.
    pub predicted_participant: Option<String>,
    pub saved: bool,
    pub digraphs_processed: usize,
    pub digraphs_received: usize,
}

pub async fn list_participants(State(state): State<SharedState>) -> Json<ParticipantsResponse> {
    Json(ParticipantsResponse {
        participants: state.store.participants(),
    })
}

pub async fn list_sessions(
    State(state): State<SharedState>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let participant = q.participant.trim();
    if participant.is_empty() {
        return Err(ApiError::bad_request("participant is required"));
    }
    Ok(Json(SessionsResponse {
        sessions: state.store.sessions(participant),
    }))
}

pub async fn view_history(
    State(state): State<SharedState>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let participant = q.participant.trim();
    if participant.is_empty() {
        return Err(ApiError::bad_request("participant is required"));
    }
    let session = q.session.trim();
    if session.is_empty() {
        return Err(ApiError::bad_request("session is required"));
    }
    let session: i64 = session
        .parse()
        .map_err(|_| ApiError::bad_request("session must be an integer"))?;
    Ok(Json(HistoryResponse {
        history: state.store.history(participant, session),
    }))
}

/// Accepts an integer or an integer string.
fn parse_session(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub async fn predict(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid JSON payload: {e}")))?;
    debug!(%payload, "predict request");

    let participant = payload
        .get("participant")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if participant.is_empty() {
        return Err(ApiError::bad_request("participant must be a non-empty string"));
    }

    let session = parse_session(payload.get("session"))
        .ok_or_else(|| ApiError::bad_request("session must be an integer"))?;
    if session <= 0 {
        return Err(ApiError::bad_request("session must be a positive integer"));
    }

    let raw = match payload.get("digraphs").and_then(Value::as_array) {
        Some(list) if !list.is_empty() => list,
        _ => return Err(ApiError::bad_request("must send a non-empty list of digraphs")),
    };

    let mut digraphs = Vec::with_capacity(raw.len());
    for (i, v) in raw.iter().enumerate() {
        match Digraph::from_value(v) {
            Some(d) => digraphs.push(d),
            None => warn!(index = i, digraph = %v, "skipping invalid digraph"),
        }
    }
    if digraphs.is_empty() {
        return Err(ApiError::bad_request("no valid digraphs to process"));
    }

    let (flat, rows, cols) = flatten(&digraphs);
    let worker = state.clone();
    let predicted_index =
        tokio::task::spawn_blocking(move || worker.service.predict(&flat, rows, cols))
            .await
            .map_err(|e| {
                error!(error = %e, "prediction task failed");
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: format!("prediction task failed: {e}"),
                }
            })?
            .map_err(|e| {
                warn!(error = %e, participant, session, "prediction failed");
                ApiError::from(e)
            })?;
    let predicted_participant = state.class_labels.get(predicted_index).cloned();
    info!(participant, session, predicted_index, ?predicted_participant, "predicted");

    state
        .store
        .append(participant, session, &digraphs)
        .map_err(|e| {
            error!(error = %e, "saving typing data failed");
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("could not save typing data: {e}"),
            }
        })?;

    Ok(Json(PredictResponse {
        predicted_index,
        predicted_user: participant.to_string(),
        predicted_participant,
        saved: true,
        digraphs_processed: digraphs.len(),
        digraphs_received: raw.len(),
    }))
}

const FALLBACK_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Keyprint</title>
    <style>
        :root { --bg: #0d1117; --text: #c9d1d9; --text-muted: #8b949e; --blue: #58a6ff; }
        body { font-family: -apple-system, sans-serif; background: var(--bg); color: var(--text); padding: 2rem; text-align: center; }
        p { color: var(--text-muted); }
        a { color: var(--blue); }
        code { background: rgba(255,255,255,0.1); padding: 0.2rem 0.5rem; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>Keyprint</h1>
    <p>No static files directory configured.</p>
    <p>Set <code>static_dir</code> in the config or pass <code>--static-dir</code>.</p>
    <p style="margin-top: 2rem;">API endpoints available:</p>
    <p><a href="/participants">/participants</a> · <code>/sessions?participant=</code> · <code>/history?participant=&amp;session=</code> · <code>POST /predict</code></p>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use keyprint_dnn::{Architecture, Net};
    use serde_json::json;

    use super::*;

    const BASE: &str = "participant,session,key1,key2,DU.key1.key1,DD.key1.key2,DU.key1.key2,UD.key1.key2,UU.key1.key2\n\
        alice,1,a,b,0.1,0.2,0.3,0.4,0.5\n\
        bob,1,b,c,0.1,0.2,0.3,0.4,0.5\n\
        alice,2,c,d,0.1,0.2,0.3,0.4,0.5\n";

    fn state(dir: &Path, with_model: bool) -> SharedState {
        let data = dir.join("database");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("free-text.csv"), BASE).unwrap();
        let store = TypingStore::new(data.join("free-text.csv"), data.join("free-text-new.csv"));
        store.bootstrap().unwrap();

        let service = DnnService::new(DnnLoader::default());
        if with_model {
            let model = dir.join("typing.dnn");
            Net::from_fn(Architecture::TYPING, 3, 5, |i| ((i as f32) * 0.37).sin() * 0.2)
                .unwrap()
                .save(&model)
                .unwrap();
            service.load_model(&model).unwrap();
        }
        let class_labels = store.class_labels();
        Arc::new(AppState {
            service,
            store,
            class_labels,
        })
    }

    fn body(v: Value) -> Bytes {
        Bytes::from(serde_json::to_vec(&v).unwrap())
    }

    fn digraphs(n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| {
                    let t = 0.1 + i as f64 * 0.01;
                    json!({"key1": "a", "key2": "b", "features": [t, t, t, t, t]})
                })
                .collect(),
        )
    }

    fn query(participant: &str, session: &str) -> Query<HistoryQuery> {
        Query(HistoryQuery {
            participant: participant.to_string(),
            session: session.to_string(),
        })
    }

    #[tokio::test]
    async fn participants_and_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), false);

        let Json(p) = list_participants(State(st.clone())).await;
        assert_eq!(p.participants, ["alice", "bob"]);

        let Json(s) = list_sessions(State(st.clone()), query(" alice ", ""))
            .await
            .unwrap();
        assert_eq!(s.sessions, [1, 2]);

        let err = list_sessions(State(st), query("  ", "")).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_validation() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), false);

        let Json(h) = view_history(State(st.clone()), query("alice", "2"))
            .await
            .unwrap();
        assert_eq!(h.history.len(), 1);
        assert_eq!(h.history[0]["key1"], "c");

        for (p, s) in [("", "1"), ("alice", ""), ("alice", "two")] {
            let err = view_history(State(st.clone()), query(p, s)).await.unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST, "{p:?} {s:?}");
        }
    }

    #[tokio::test]
    async fn predict_without_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), false);
        let req = json!({"participant": "alice", "session": 1, "digraphs": digraphs(3)});
        let err = predict(State(st.clone()), body(req)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        // Nothing is saved.
        assert!(st.store.history("alice", 1).len() == 1);
    }

    #[tokio::test]
    async fn predict_classifies_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), true);

        let mut list = digraphs(3);
        if let Value::Array(items) = &mut list {
            items.push(json!({"key1": "ab", "key2": "c", "features": [0, 0, 0, 0, 0]}));
        }
        let req = json!({"participant": " carol ", "session": "4", "digraphs": list});
        let Json(resp) = predict(State(st.clone()), body(req)).await.unwrap();

        assert!(resp.predicted_index < 10);
        assert_eq!(resp.predicted_user, "carol");
        assert_eq!(
            resp.predicted_participant,
            st.class_labels.get(resp.predicted_index).cloned()
        );
        assert!(resp.saved);
        assert_eq!(resp.digraphs_processed, 3);
        assert_eq!(resp.digraphs_received, 4);

        assert_eq!(st.store.history("carol", 4).len(), 3);
        assert_eq!(st.store.sessions("carol"), [4]);
    }

    #[tokio::test]
    async fn predict_rejects_bad_requests() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), true);

        let cases = [
            json!({"participant": "", "session": 1, "digraphs": digraphs(3)}),
            json!({"session": 1, "digraphs": digraphs(3)}),
            json!({"participant": "a", "session": 0, "digraphs": digraphs(3)}),
            json!({"participant": "a", "session": "x", "digraphs": digraphs(3)}),
            json!({"participant": "a", "digraphs": digraphs(3)}),
            json!({"participant": "a", "session": 1, "digraphs": []}),
            json!({"participant": "a", "session": 1, "digraphs": "ab"}),
            json!({"participant": "a", "session": 1, "digraphs": [{"key1": "a"}]}),
        ];
        for req in cases {
            let err = predict(State(st.clone()), body(req.clone())).await.unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST, "{req}");
        }

        let err = predict(State(st.clone()), Bytes::from_static(b"{not json"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn predict_shape_the_model_cannot_take() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), true);
        let req = json!({"participant": "alice", "session": 9, "digraphs": digraphs(5)});
        let err = predict(State(st.clone()), body(req)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(st.store.history("alice", 9).is_empty());
    }

    #[tokio::test]
    async fn save_failure_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path(), true);
        fs::write(st.store.ext_path(), "").unwrap();
        let req = json!({"participant": "alice", "session": 1, "digraphs": digraphs(3)});
        let err = predict(State(st), body(req)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            ApiError::from(KeyprintError::NotLoaded).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(KeyprintError::ShapeMismatch { len: 1, rows: 3, cols: 5 }).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(KeyprintError::Inference("no fit".into())).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(KeyprintError::LabelOutOfRange {
                label: 12,
                classes: 10
            })
            .status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
