#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header};
use portico::VerifyKey;
use portico::middleware::{Authenticator, WireResponse};
use serde_json::{Value, json};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

pub const SECRET: &[u8] = b"integration-secret";

pub fn key() -> VerifyKey {
    VerifyKey::hmac(SECRET)
}

pub fn authenticator() -> Arc<Authenticator> {
    Arc::new(Authenticator::new(key()))
}

/// An HS256 token whose claims grant `permissions` (group → path → actions).
pub fn token(permissions: Value) -> String {
    let claims = json!({ "user": { "id": 7, "acl": { "permissions": permissions } } });
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

pub fn bearer(permissions: Value) -> String {
    format!("Bearer {}", token(permissions))
}

pub async fn body_bytes(wire: WireResponse) -> Bytes {
    wire.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(wire: WireResponse) -> Value {
    serde_json::from_slice(&body_bytes(wire).await).unwrap()
}

// ── Log capture ───────────────────────────────────────────────────────────────

/// One captured event: its level and every field rendered as text.
#[derive(Clone, Debug)]
pub struct Captured {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

impl Captured {
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

/// A `tracing` layer that records events in memory.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<Captured>>>);

impl Capture {
    /// Installs the capture as the default subscriber for the current thread.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn events(&self) -> Vec<Captured> {
        self.0.lock().unwrap().clone()
    }

    /// Events emitted by the logging middleware.
    pub fn requests(&self) -> Vec<Captured> {
        self.events().into_iter().filter(|e| e.field("message") == "request handled").collect()
    }
}

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        self.0.lock().unwrap().push(Captured { level: *event.metadata().level(), fields });
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }
}
