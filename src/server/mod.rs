//! HTTP adapter over [`DB`].
//!
//! ```text
//! GET|POST /pddb/<action>/<table>   find, find_one, insert, upsert, delete, drop, schema
//! GET      /pddb/tables             table names
//! GET      /pddb/stats              engine counters
//! ```
//!
//! GET reads the query string. POST reads the query string followed by a
//! urlencoded form body, when there is one. Parameters are kept as ordered
//! pairs so insert creates columns in request order.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value as JsonValue, json};
use tracing::{error, info};

use crate::db::{DB, Outcome, Stats};
use crate::error::Error;
use crate::params::Operation;

pub type AppState = Arc<DB>;

type Params = Vec<(String, String)>;

pub fn router(db: AppState) -> Router {
    Router::new()
        .route("/pddb/tables", get(list_tables))
        .route("/pddb/stats", get(stats))
        .route("/pddb/:action/:table", get(action_get).post(action_post))
        .with_state(db)
}

/// Bind and serve until ctrl-c.
pub async fn serve(db: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, db = db.name(), "listening");
    axum::serve(listener, router(db))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await
}

async fn list_tables(State(db): State<AppState>) -> Json<Vec<String>> {
    Json(db.table_names())
}

async fn stats(State(db): State<AppState>) -> Json<Stats> {
    Json(db.stats())
}

async fn action_get(
    State(db): State<AppState>,
    Path((action, table)): Path<(String, String)>,
    Query(params): Query<Params>,
) -> Response {
    dispatch(db, action, table, params).await
}

async fn action_post(
    State(db): State<AppState>,
    Path((action, table)): Path<(String, String)>,
    Query(query): Query<Params>,
    form: Option<Form<Params>>,
) -> Response {
    let params = merge_params(query, form.map(|Form(body)| body));
    dispatch(db, action, table, params).await
}

/// Query-string pairs first, then the body's.
pub fn merge_params(query: Params, body: Option<Params>) -> Params {
    let mut params = query;
    params.extend(body.unwrap_or_default());
    params
}

/// Engine calls may write snapshots, so they run on the blocking pool.
async fn dispatch(db: AppState, action: String, table: String, params: Params) -> Response {
    let joined = tokio::task::spawn_blocking(move || respond(&db, &action, &table, params)).await;
    let (status, body) = joined.unwrap_or_else(|e| {
        error!(error = %e, "request task failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "request task failed" }),
        )
    });
    (status, Json(body)).into_response()
}

/// Run one action and render it as `(status, json)`.
pub fn respond(db: &DB, action: &str, table: &str, params: Params) -> (StatusCode, JsonValue) {
    let result = if action == "schema" {
        db.schema(table).map(|columns| json!(columns))
    } else {
        action
            .parse::<Operation>()
            .and_then(|op| db.execute(op, table, params))
            .map(render_outcome)
    };

    match result {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!(action, table, error = %e, "request failed");
            }
            (status, json!({ "error": e.to_string() }))
        }
    }
}

pub fn render_outcome(outcome: Outcome) -> JsonValue {
    match outcome {
        Outcome::Rows(rows) => json!(rows),
        Outcome::Row(Some(row)) => json!(row),
        Outcome::Row(None) => json!({}),
        Outcome::Count(count) => json!({ "count": count }),
        Outcome::Dropped(dropped) => json!({ "dropped": dropped }),
    }
}

/// Transport status for each error kind.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        Error::AmbiguousParameter(_) | Error::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Persistence { .. } | Error::Io(_) | Error::Corruption(_) | Error::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
