use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use shared::filter::{DeviceFilter, SortOrder};
use shared::protocol::API_PREFIX;
use shared::types::Device;
use crate::store::device_store::StoredDevice;
use crate::store_manager::StoreHandle;
use crate::view::RenderedList;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreHandle,
    pub rendered_rx: watch::Receiver<RenderedList>,
    pub filter_tx: Arc<watch::Sender<DeviceFilter>>,
    pub sort: SortOrder,
    pub default_expiration_secs: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub sort: SortOrder,
    pub default_expiration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterBody {
    pub query: String,
}

#[derive(Deserialize)]
pub struct DeviceQuery {
    pub q: Option<String>,
}

/// Detail view of one stored entry
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetails {
    pub path: String,
    pub device: Device,
    pub first_seen: chrono::DateTime<chrono::Utc>,
    pub last_seen: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl From<StoredDevice> for DeviceDetails {
    fn from(entry: StoredDevice) -> Self {
        Self {
            path: entry.device.path().to_string(),
            device: entry.device,
            first_seen: entry.first_seen,
            last_seen: entry.last_seen,
            expires_at: entry.expires_at,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/config", get(get_config))
        .route("/filter", get(get_filter).put(put_filter))
        .route("/devices", get(get_devices))
        .route("/devices/hash", get(get_hash))
        .route("/devices/all", get(get_all_devices))
        .route("/devices/:uuid", get(get_device))
        .with_state(state);

    Router::new().nest(API_PREFIX, routes)
}

async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        sort: state.sort,
        default_expiration_secs: state.default_expiration_secs,
    })
}

async fn get_filter(State(state): State<AppState>) -> Json<FilterBody> {
    let query = state.filter_tx.borrow().query().to_string();
    Json(FilterBody { query })
}

async fn put_filter(
    State(state): State<AppState>,
    Json(body): Json<FilterBody>,
) -> Json<FilterBody> {
    let filter = DeviceFilter::new(&body.query);
    tracing::info!("Search query set to {:?}", filter.query());
    let query = filter.query().to_string();
    state.filter_tx.send_replace(filter);
    Json(FilterBody { query })
}

async fn get_devices(
    State(state): State<AppState>,
    Query(params): Query<DeviceQuery>,
) -> Json<Vec<Device>> {
    let rows = state.rendered_rx.borrow().rows.clone();
    let filter = DeviceFilter::new(params.q.as_deref().unwrap_or(""));

    Json(rows.iter().filter(|d| filter.matches(d)).cloned().collect())
}

/// Every stored device regardless of the search query, in store order
async fn get_all_devices(State(state): State<AppState>) -> Result<Json<Vec<Device>>, StatusCode> {
    state
        .store
        .get_all()
        .await
        .map(|snapshot| Json(snapshot.as_ref().clone()))
        .map_err(|e| {
            tracing::error!("Failed to query devices: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn get_hash(State(state): State<AppState>) -> String {
    state.rendered_rx.borrow().fingerprint.clone()
}

async fn get_device(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<Vec<DeviceDetails>>, StatusCode> {
    let entries = state
        .store
        .get_by_uuid(uuid)
        .await
        .map_err(|e| {
            tracing::error!("Failed to query device: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if entries.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(entries.into_iter().map(DeviceDetails::from).collect()))
}
