#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use roomflow::bot::{BotRegistry, MessagingSession, Presence, SessionError};
use roomflow::workflow::storage::WorkflowStorage;
use roomflow::Bot;
use sqlx::sqlite::SqlitePoolOptions;
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

pub async fn memory_storage() -> WorkflowStorage {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let storage = WorkflowStorage::new(pool);
    storage.init_schema().await.unwrap();
    storage
}

/// Serve `router` on an ephemeral local port
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

pub fn bot(id: &str, primary: bool) -> Bot {
    Bot {
        id: id.into(),
        display_name: id.into(),
        user_id: format!("@{id}:example.org"),
        password: "secret".into(),
        homeserver_url: None,
        active: true,
        primary,
    }
}

/// Session double that records sends and answers presence from a table
#[derive(Default)]
pub struct FakeSession {
    pub id: String,
    pub sent: Mutex<Vec<(String, String)>>,
    pub presence: HashMap<String, Presence>,
    pub aliases: HashMap<String, String>,
}

impl FakeSession {
    pub fn named(id: &str) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingSession for FakeSession {
    fn bot_id(&self) -> &str {
        &self.id
    }

    async fn send_message(&self, room_id: &str, content: &str) -> Result<(), SessionError> {
        self.sent
            .lock()
            .unwrap()
            .push((room_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn get_presence(&self, user_id: &str) -> Result<Presence, SessionError> {
        self.presence
            .get(user_id)
            .cloned()
            .ok_or_else(|| SessionError::Decode(format!("no presence for {user_id}")))
    }

    async fn resolve_alias(&self, alias: &str) -> Result<String, SessionError> {
        self.aliases
            .get(alias)
            .cloned()
            .ok_or_else(|| SessionError::UnresolvedAlias(alias.to_string()))
    }
}

/// Registry with `session` as the only, primary bot
pub fn registry_with(session: Arc<FakeSession>) -> Arc<BotRegistry> {
    let id = session.id.clone();
    Arc::new(BotRegistry::from_sessions(vec![(
        bot(&id, true),
        session as Arc<dyn MessagingSession>,
    )]))
}
