//! REST handlers for the simulated appliance.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::state::AppState;
use crate::types::{BackupCreated, UpdateAvailability};

// Bearer check; simdev accepts everything when no token is configured
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), StatusCode> {
    let Some(expected) = state.token.as_ref() else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

pub async fn health_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&state, &headers)?;
    let mut inner = state.inner.lock().await;
    let status = inner.current_status();
    Ok(Json(status).into_response())
}

pub async fn health_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&state, &headers)?;
    let inner = state.inner.lock().await;
    Ok(Json(inner.history.clone()).into_response())
}

#[derive(Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    // Only entries with an id above this watermark are returned
    since: Option<u64>,
}

fn default_limit() -> usize {
    100
}

pub async fn logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<LogsQuery>,
) -> Result<Response, StatusCode> {
    authorize(&state, &headers)?;
    let inner = state.inner.lock().await;
    let mut page: Vec<_> = inner
        .logs
        .iter()
        .filter(|e| q.since.map_or(true, |s| e.id > s))
        .cloned()
        .collect();
    if page.len() > q.limit {
        page.drain(..page.len() - q.limit);
    }
    page.reverse(); // newest first
    Ok(Json(page).into_response())
}

pub async fn create_backup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&state, &headers)?;
    let mut inner = state.inner.lock().await;
    let name = format!("gridtop-backup-{}.db", Utc::now().format("%Y%m%d-%H%M%S"));
    inner.backups.push(name.clone());
    inner.push_log("Backup completed", Some(name.clone()));
    tracing::info!(backup = %name, "backup created");
    Ok(Json(BackupCreated { backup_name: name }).into_response())
}

pub async fn download_backup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Response, StatusCode> {
    authorize(&state, &headers)?;
    let inner = state.inner.lock().await;
    if !inner.backups.contains(&name) {
        return Err(StatusCode::NOT_FOUND);
    }
    // Opaque placeholder blob; the console treats it as uninterpreted bytes
    let body = format!("GRIDTOP-BACKUP {name}\n").into_bytes();
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        body,
    )
        .into_response())
}

pub async fn restore(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, StatusCode> {
    authorize(&state, &headers)?;
    let mut received: Option<(String, usize)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("upload.db").to_string();
            let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            received = Some((name, data.len()));
        }
    }
    let Some((name, len)) = received else {
        return Err(StatusCode::BAD_REQUEST);
    };
    let mut inner = state.inner.lock().await;
    inner.push_log("Database restored", Some(format!("{name} ({len} bytes)")));
    tracing::info!(file = %name, bytes = len, "restore accepted");
    Ok(StatusCode::OK.into_response())
}

pub async fn reboot(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&state, &headers)?;
    let mut inner = state.inner.lock().await;
    inner.push_log("Reboot requested", None);
    tracing::info!("reboot requested");
    Ok(StatusCode::OK.into_response())
}

pub async fn factory_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&state, &headers)?;
    let mut inner = state.inner.lock().await;
    let name = format!("gridtop-prereset-{}.db", Utc::now().format("%Y%m%d-%H%M%S"));
    inner.backups.push(name.clone());
    inner.push_log("Factory reset started", Some(name.clone()));
    tracing::info!(backup = %name, "factory reset");
    Ok(Json(BackupCreated { backup_name: name }).into_response())
}

pub async fn update_check(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&state, &headers)?;
    Ok(Json(UpdateAvailability {
        updates_available: true,
        current_version_id: "2.4.1".into(),
        remote_version_id: "2.5.0".into(),
        change_log: Some("- faster meter collection\n- charger session fixes".into()),
    })
    .into_response())
}

pub async fn update_apply(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&state, &headers)?;
    let mut inner = state.inner.lock().await;
    let phase = inner.update_progress(state.fail_update).phase;
    if phase == "starting" || phase == "running" {
        return Err(StatusCode::CONFLICT);
    }
    inner.update_applied_at = Some(std::time::Instant::now());
    inner.push_log("Software update started", Some("2.5.0".into()));
    tracing::info!("update apply accepted");
    Ok(StatusCode::OK.into_response())
}

pub async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&state, &headers)?;
    let inner = state.inner.lock().await;
    Ok(Json(inner.update_progress(state.fail_update)).into_response())
}
