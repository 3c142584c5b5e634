use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use chrono::{DateTime, Utc};
use minepool_accounts::axum_api::accounts_router;
use minepool_accounts::{
    AccountsConfig, AccountsError, AccountsService, EmailSender, InMemoryStorage, Storage, User,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct CapturingEmailSender {
    pub sent_emails: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl CapturingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// The verification code in the most recently sent email body.
    #[allow(dead_code)]
    pub fn last_code(&self) -> Option<String> {
        let sent = self.sent_emails.lock().unwrap();
        let (_, _, body) = sent.last()?;
        body.split(|c: char| !c.is_ascii_digit())
            .find(|chunk| chunk.len() >= 4)
            .map(|chunk| chunk.to_string())
    }
}

#[async_trait]
impl EmailSender for CapturingEmailSender {
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), AccountsError> {
        self.sent_emails.lock().unwrap().push((
            recipient.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

#[allow(dead_code)]
pub fn spawn_app() -> (Router, Arc<CapturingEmailSender>, Arc<InMemoryStorage>) {
    spawn_app_with_config(AccountsConfig::default())
}

#[allow(dead_code)]
pub fn spawn_app_with_config(
    config: AccountsConfig,
) -> (Router, Arc<CapturingEmailSender>, Arc<InMemoryStorage>) {
    let storage = Arc::new(InMemoryStorage::new());
    let email_sender = Arc::new(CapturingEmailSender::new());
    let accounts = Arc::new(AccountsService::new(
        config,
        storage.clone(),
        email_sender.clone(),
    ));
    (accounts_router(accounts), email_sender, storage)
}

/// Inserts a user directly, bypassing the verification flow, for tests that
/// exercise badge and mining behavior.
#[allow(dead_code)]
pub async fn seed_user(
    storage: &InMemoryStorage,
    email: &str,
    referral_count: i32,
    mining_started_at: Option<DateTime<Utc>>,
) -> Uuid {
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: "$argon2id$seeded".to_string(),
        referral_count,
        mining_started_at,
        created_at: Utc::now(),
    };
    let id = user.id;
    storage.insert_user(user).await.unwrap();
    id
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
