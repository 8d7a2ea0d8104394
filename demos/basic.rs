//! A small inventory API behind bearer-token authentication.
//!
//! Run with:
//!   RUST_LOG=portico=debug,basic=info cargo run --example basic
//!
//! The server signs and verifies HS256 tokens with `PORTICO_DEMO_SECRET`
//! (default `change-me`). Try:
//!   TOKEN=$(curl -s 'http://localhost:8080/token?user=alice' | tr -d '"')
//!   curl -H "Authorization: Bearer $TOKEN" http://localhost:8080/items/42
//!   curl -X POST -H "Authorization: Bearer $TOKEN" http://localhost:8080/items \
//!        -d '{"name":"lamp"}'
//!   curl http://localhost:8080/items/42            # 401, code "JWT middleware.401100"
//!   curl http://localhost:8080/docs                # 302 to /docs/index.html

use std::collections::HashMap;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use http::{Method, StatusCode};
use jsonwebtoken::{EncodingKey, Header};
use portico::{ApiError, Claims, Config, Request, Response, Server, VerifyKey};
use serde_json::{Value, json};
use tracing::{error, info};

const SYSTEM: &str = "inventory";
const TOKEN_TTL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config.with_public_paths(["/token", "/docs"]),
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let secret = std::env::var("PORTICO_DEMO_SECRET").unwrap_or_else(|_| "change-me".to_owned());
    let signing = EncodingKey::from_secret(secret.as_bytes());

    let server = Server::new(config, VerifyKey::hmac(secret.as_bytes()))
        .handle(Method::GET, "/token", move |req: Request| issue_token(req, signing.clone()))
        .handle(Method::GET, "/docs", docs)
        .handle(Method::GET, "/items/{id}", get_item)
        .handle(Method::POST, "/items", create_item)
        .handle(Method::DELETE, "/items/{id}", delete_item);

    match server.listen_and_serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {e}");
            ExitCode::FAILURE
        }
    }
}

// GET /token?user=<name>
//
// Grants read on /items/42 and create on /items. Nothing else.
async fn issue_token(req: Request, key: EncodingKey) -> Result<Response, ApiError> {
    let user = req
        .uri()
        .query()
        .and_then(|q| q.split('&').find_map(|pair| pair.strip_prefix("user=")))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "user is required", SYSTEM, 1))?;

    let permissions = HashMap::from([(
        "inventory".to_owned(),
        HashMap::from([
            ("/items/42".to_owned(), vec!["read".to_owned()]),
            ("/items".to_owned(), vec!["create".to_owned()]),
        ]),
    )]);
    let mut claims = Claims::with_permissions(permissions);
    claims.user.extra.insert("name".to_owned(), json!(user));
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
    claims.extra.insert("exp".to_owned(), json!(now + TOKEN_TTL_SECS));

    let token = jsonwebtoken::encode(&Header::default(), &claims, &key)
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), SYSTEM, 2))?;
    info!(user, "token issued");
    Ok(Response::ok(token))
}

async fn docs(_req: Request) -> Response {
    Response::redirect("docs/index.html")
}

// GET /items/{id}
async fn get_item(req: Request) -> Response {
    let id = req.param("id").unwrap_or_default();
    let name = req
        .claims()
        .and_then(|c| c.user.extra.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("anonymous");
    Response::ok(json!({ "id": id, "name": "lamp", "viewer": name }))
}

// POST /items
async fn create_item(mut req: Request) -> Result<Response, ApiError> {
    let item: Value = req
        .json()
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string(), SYSTEM, 3))?;
    let mut res = Response::new(StatusCode::CREATED, item, None);
    res.set_header("location", "/items/99");
    Ok(res)
}

// DELETE /items/{id}: the demo token never grants delete, so this is a 401.
async fn delete_item(req: Request) -> Response {
    Response::ok(json!({ "deleted": req.param("id") }))
}
