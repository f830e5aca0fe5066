//! Axum REST API exposing the catalog and the donation workflow.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::catalog::SharedCatalog;
use crate::errors::DonationError;
use crate::notify::NotificationCenter;
use crate::payment::{PaymentGateway, PaymentSubmitter};
use crate::selection::{SelectionController, SelectionState};
use crate::store::{KeyValueStore, PreferenceStore};
use crate::types::Presets;

pub struct ApiState<K, G> {
    pub catalog: SharedCatalog,
    pub selection: Mutex<SelectionController<K>>,
    pub submitter: PaymentSubmitter<G>,
    pub preferences: Arc<PreferenceStore<K>>,
    pub notifications: Arc<NotificationCenter>,
}

pub fn router<K, G>(state: Arc<ApiState<K, G>>) -> Router
where
    K: KeyValueStore + 'static,
    G: PaymentGateway + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/foundations", get(get_foundations::<K, G>))
        .route("/selection", get(get_selection::<K, G>))
        .route("/selection/pick", post(pick_foundation::<K, G>))
        .route("/selection/amount", post(change_amount::<K, G>))
        .route("/selection/custom", post(edit_custom_amount::<K, G>))
        .route("/selection/close", post(close_dialog::<K, G>))
        .route("/selection/submit", post(submit::<K, G>))
        .route("/preferences", get(get_preferences::<K, G>))
        .route("/notifications", get(get_notifications::<K, G>))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRequest {
    pub foundation_id: String,
}

#[derive(Deserialize)]
pub struct AmountRequest {
    pub value: String,
}

#[derive(Deserialize)]
pub struct CustomAmountRequest {
    pub input: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionView {
    #[serde(flatten)]
    pub state: SelectionState,
    pub presets: Presets,
    pub can_submit: bool,
}

#[derive(Serialize)]
pub struct CustomAmountResponse {
    pub accepted: bool,
    pub selection: SelectionView,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn view<K: KeyValueStore>(controller: &SelectionController<K>) -> SelectionView {
    SelectionView {
        state: controller.snapshot().clone(),
        presets: controller.presets().clone(),
        can_submit: controller.can_submit(),
    }
}

fn error_response(e: DonationError) -> Response {
    let status = match &e {
        DonationError::InvalidTransition { .. } => StatusCode::CONFLICT,
        DonationError::UnknownAmount(_) | DonationError::SubmitDisabled => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => {
            warn!("Request failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /foundations`
///
/// Current catalog state: `loading`, `ready` with the list, or `failed`.
pub async fn get_foundations<K, G>(State(state): State<Arc<ApiState<K, G>>>) -> impl IntoResponse {
    let catalog = state.catalog.read().await.clone();
    Json(catalog)
}

/// `GET /selection`
pub async fn get_selection<K: KeyValueStore, G>(
    State(state): State<Arc<ApiState<K, G>>>,
) -> impl IntoResponse {
    let selection = state.selection.lock().await;
    Json(view(&selection))
}

/// `POST /selection/pick`
///
/// Opens the donation dialog for a foundation from the loaded catalog.
/// Answers 503 while the catalog is loading or after it failed.
pub async fn pick_foundation<K: KeyValueStore, G>(
    State(state): State<Arc<ApiState<K, G>>>,
    Json(body): Json<PickRequest>,
) -> Response {
    let found = {
        let catalog = state.catalog.read().await;
        if catalog.is_ready() {
            Ok(catalog.find(&body.foundation_id).cloned())
        } else {
            Err(catalog.name())
        }
    };
    let foundation = match found {
        Ok(Some(foundation)) => foundation,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Unknown foundation: {}", body.foundation_id),
                }),
            )
                .into_response();
        }
        Err(catalog) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: format!("Catalog is {catalog}"),
                }),
            )
                .into_response();
        }
    };

    let mut selection = state.selection.lock().await;
    match selection.pick_foundation(foundation).await {
        Ok(()) => (StatusCode::OK, Json(view(&selection))).into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /selection/amount`
pub async fn change_amount<K: KeyValueStore, G>(
    State(state): State<Arc<ApiState<K, G>>>,
    Json(body): Json<AmountRequest>,
) -> Response {
    let mut selection = state.selection.lock().await;
    match selection.change_amount(&body.value).await {
        Ok(()) => (StatusCode::OK, Json(view(&selection))).into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /selection/custom`
///
/// Non-numeric input is not an error; it is reported as `accepted: false`.
pub async fn edit_custom_amount<K: KeyValueStore, G>(
    State(state): State<Arc<ApiState<K, G>>>,
    Json(body): Json<CustomAmountRequest>,
) -> Response {
    let mut selection = state.selection.lock().await;
    match selection.edit_custom_amount(&body.input).await {
        Ok(accepted) => (
            StatusCode::OK,
            Json(CustomAmountResponse {
                accepted,
                selection: view(&selection),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /selection/close`
pub async fn close_dialog<K: KeyValueStore, G>(
    State(state): State<Arc<ApiState<K, G>>>,
) -> Response {
    let mut selection = state.selection.lock().await;
    match selection.close_dialog() {
        Ok(()) => (StatusCode::OK, Json(view(&selection))).into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /selection/submit`
///
/// The selection lock is released while the payment is in flight; the
/// controller sits in `Submitting` and refuses everything else meanwhile.
/// Payment and reset run on their own task so they complete even if the
/// client goes away.
pub async fn submit<K, G>(State(state): State<Arc<ApiState<K, G>>>) -> Response
where
    K: KeyValueStore + 'static,
    G: PaymentGateway + 'static,
{
    let request = match state.selection.lock().await.begin_submit() {
        Ok(request) => request,
        Err(e) => return error_response(e),
    };

    let worker = Arc::clone(&state);
    let task = tokio::spawn(async move {
        let notification = worker.submitter.submit(&request).await;
        let finished = worker.selection.lock().await.finish_submit();
        finished.map(|()| notification)
    });

    match task.await {
        Ok(Ok(notification)) => (StatusCode::OK, Json(notification)).into_response(),
        Ok(Err(e)) => error_response(e),
        Err(e) => {
            error!("Submission task failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Submission did not complete".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// `GET /preferences`
pub async fn get_preferences<K: KeyValueStore, G>(
    State(state): State<Arc<ApiState<K, G>>>,
) -> Response {
    match state.preferences.all().await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /notifications`
pub async fn get_notifications<K, G>(
    State(state): State<Arc<ApiState<K, G>>>,
) -> impl IntoResponse {
    Json(state.notifications.recent())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{json, Value};
    use tokio::sync::RwLock;

    use super::*;
    use crate::catalog::CatalogState;
    use crate::payment::tests::FakeGateway;
    use crate::store::MemoryKeyValue;
    use crate::types::{Foundation, MinLatency, PaymentRequest};

    fn catalog() -> CatalogState {
        CatalogState::Ready(vec![
            Foundation {
                id: "1".to_string(),
                name: "Habitat for Humanity".to_string(),
                image: "habitat.jpg".to_string(),
                currency: "THB".to_string(),
            },
            Foundation {
                id: "2".to_string(),
                name: "UNICEF".to_string(),
                image: "unicef.jpg".to_string(),
                currency: "USD".to_string(),
            },
        ])
    }

    async fn spawn_api<G: PaymentGateway + 'static>(catalog: CatalogState, gateway: G) -> String {
        let preferences = Arc::new(PreferenceStore::new(MemoryKeyValue::default(), "foundationData"));
        let notifications = Arc::new(NotificationCenter::default());
        let presets = Presets::new(vec![10, 20, 50, 100, 500]).unwrap();
        let state = Arc::new(ApiState {
            catalog: Arc::new(RwLock::new(catalog)),
            selection: Mutex::new(SelectionController::new(preferences.clone(), presets)),
            submitter: PaymentSubmitter::new(gateway, MinLatency::default(), notifications.clone()),
            preferences,
            notifications,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn post_json(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
        let resp = client.post(url).json(&body).send().await.unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }

    async fn get_json(client: &reqwest::Client, url: String) -> Value {
        client.get(url).send().await.unwrap().json().await.unwrap()
    }

    #[tokio::test]
    async fn full_custom_donation_flow() {
        let base = spawn_api(catalog(), FakeGateway::default()).await;
        let client = reqwest::Client::new();

        let (status, body) = post_json(&client, format!("{base}/selection/pick"), json!({ "foundationId": "1" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "dialog_open");
        assert_eq!(body["donationAmount"], "10");
        assert_eq!(body["canSubmit"], true);

        let (_, body) = post_json(&client, format!("{base}/selection/amount"), json!({ "value": "custom" })).await;
        assert_eq!(body["canSubmit"], false);

        let (_, body) = post_json(&client, format!("{base}/selection/custom"), json!({ "input": "abc" })).await;
        assert_eq!(body["accepted"], false);

        let (_, body) = post_json(&client, format!("{base}/selection/custom"), json!({ "input": "75" })).await;
        assert_eq!(body["accepted"], true);
        assert_eq!(body["selection"]["customAmount"], 75);

        let (status, body) = post_json(&client, format!("{base}/selection/submit"), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "success");

        let selection = get_json(&client, format!("{base}/selection")).await;
        assert_eq!(selection["state"], "idle");

        let preferences = get_json(&client, format!("{base}/preferences")).await;
        assert_eq!(
            preferences,
            json!([{ "id": "1", "donationAmount": "custom", "customAmount": 75 }])
        );

        let notifications = get_json(&client, format!("{base}/notifications")).await;
        assert_eq!(notifications.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_payment_reports_generic_failure() {
        let base = spawn_api(catalog(), FakeGateway::failing()).await;
        let client = reqwest::Client::new();

        post_json(&client, format!("{base}/selection/pick"), json!({ "foundationId": "2" })).await;
        let (status, body) = post_json(&client, format!("{base}/selection/submit"), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "failure");
        assert_eq!(body["title"], "Error");

        let selection = get_json(&client, format!("{base}/selection")).await;
        assert_eq!(selection["state"], "idle");
    }

    #[tokio::test]
    async fn maps_errors_to_status_codes() {
        let base = spawn_api(catalog(), FakeGateway::default()).await;
        let client = reqwest::Client::new();

        let (status, _) = post_json(&client, format!("{base}/selection/pick"), json!({ "foundationId": "99" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = post_json(&client, format!("{base}/selection/submit"), json!({})).await;
        assert_eq!(status, StatusCode::CONFLICT);

        post_json(&client, format!("{base}/selection/pick"), json!({ "foundationId": "1" })).await;
        let (status, body) = post_json(&client, format!("{base}/selection/amount"), json!({ "value": "33" })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("33"));

        post_json(&client, format!("{base}/selection/amount"), json!({ "value": "custom" })).await;
        let (status, _) = post_json(&client, format!("{base}/selection/submit"), json!({})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn picking_requires_a_ready_catalog() {
        let base = spawn_api(CatalogState::Failed, FakeGateway::default()).await;
        let client = reqwest::Client::new();

        let catalog = get_json(&client, format!("{base}/foundations")).await;
        assert_eq!(catalog, json!({ "status": "failed" }));

        let (status, body) = post_json(&client, format!("{base}/selection/pick"), json!({ "foundationId": "1" })).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Catalog is failed");
    }

    #[tokio::test]
    async fn picking_while_loading_is_unavailable() {
        let base = spawn_api(CatalogState::Loading, FakeGateway::default()).await;
        let client = reqwest::Client::new();

        let (status, body) = post_json(&client, format!("{base}/selection/pick"), json!({ "foundationId": "1" })).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Catalog is loading");
    }

    /// Takes a while to answer, like a slow payment provider.
    struct SlowGateway {
        delay: Duration,
    }

    impl PaymentGateway for SlowGateway {
        async fn pay(&self, _request: &PaymentRequest) -> crate::errors::Result<()> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn submission_completes_after_client_disconnects() {
        let base = spawn_api(
            catalog(),
            SlowGateway {
                delay: Duration::from_millis(500),
            },
        )
        .await;
        let client = reqwest::Client::new();

        let (status, _) = post_json(&client, format!("{base}/selection/pick"), json!({ "foundationId": "1" })).await;
        assert_eq!(status, StatusCode::OK);

        let impatient = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let result = impatient
            .post(format!("{base}/selection/submit"))
            .send()
            .await;
        assert!(result.is_err());

        tokio::time::sleep(Duration::from_millis(1_500)).await;

        let selection = get_json(&client, format!("{base}/selection")).await;
        assert_eq!(selection["state"], "idle");

        let notifications = get_json(&client, format!("{base}/notifications")).await;
        assert_eq!(notifications.as_array().unwrap().len(), 1);
        assert_eq!(notifications[0]["kind"], "success");

        let (status, _) = post_json(&client, format!("{base}/selection/pick"), json!({ "foundationId": "2" })).await;
        assert_eq!(status, StatusCode::OK);
    }
}
