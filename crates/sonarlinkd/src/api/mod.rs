//! HTTP surface of the daemon.
//!
//! | Method | Path                     | Operation                  |
//! |--------|--------------------------|----------------------------|
//! | GET    | `/connections`           | list                       |
//! | POST   | `/connections`           | create                     |
//! | POST   | `/connections/test`      | test unsaved credentials   |
//! | GET    | `/connections/{id}`      | get                        |
//! | PATCH  | `/connections/{id}`      | patch                      |
//! | DELETE | `/connections/{id}`      | delete                     |
//! | POST   | `/connections/{id}/test` | test a stored connection   |
//!
//! Handlers only extract, delegate to [`ConnectionService`] and wrap the result.

mod error;
mod extract;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use sonarlink_core::{
    Connection, ConnectionPatch, ConnectionService, NewConnection, TestConnectionRequest,
};
use tower_http::trace::TraceLayer;

use self::error::Result;
use self::extract::{IdPath, ValidJson};

/// Build the application router
pub fn router(service: ConnectionService) -> Router {
    Router::new()
        .route("/connections", get(list_connections).post(create_connection))
        .route("/connections/test", post(test_connection))
        .route(
            "/connections/{id}",
            get(get_connection)
                .patch(patch_connection)
                .delete(delete_connection),
        )
        .route("/connections/{id}/test", post(test_stored_connection))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn list_connections(
    State(service): State<ConnectionService>,
) -> Result<Json<Vec<Connection>>> {
    Ok(Json(service.list().await?))
}

async fn create_connection(
    State(service): State<ConnectionService>,
    ValidJson(new): ValidJson<NewConnection>,
) -> Result<Json<Connection>> {
    Ok(Json(service.create(new).await?))
}

async fn test_connection(
    State(service): State<ConnectionService>,
    ValidJson(request): ValidJson<TestConnectionRequest>,
) -> Result<StatusCode> {
    service.test_connection(request).await?;
    Ok(StatusCode::OK)
}

async fn get_connection(
    State(service): State<ConnectionService>,
    IdPath(id): IdPath,
) -> Result<Json<Connection>> {
    Ok(Json(service.get(id).await?))
}

async fn patch_connection(
    State(service): State<ConnectionService>,
    IdPath(id): IdPath,
    ValidJson(patch): ValidJson<ConnectionPatch>,
) -> Result<Json<Connection>> {
    Ok(Json(service.patch(id, patch).await?))
}

async fn delete_connection(
    State(service): State<ConnectionService>,
    IdPath(id): IdPath,
) -> Result<Json<Connection>> {
    Ok(Json(service.delete(id).await?))
}

async fn test_stored_connection(
    State(service): State<ConnectionService>,
    IdPath(id): IdPath,
) -> Result<StatusCode> {
    service.test_stored_connection(id).await?;
    Ok(StatusCode::OK)
}
