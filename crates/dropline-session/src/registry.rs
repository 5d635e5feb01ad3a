//! The join-key directory: which live session each key opens.

use std::collections::HashMap;
use std::sync::Arc;

use dropline_engine::RuleEngine;
use dropline_protocol::{Codec, JoinKey, JsonCodec};
use rand::Rng;
use tokio::sync::RwLock;

use crate::broadcast::Subscriber;
use crate::{Session, SessionConfig, SessionError};

/// Maps join keys to live sessions.
///
/// One registry is shared by every connection handler. A key stays
/// resolvable from the moment [`create`](Self::create) returns it until
/// [`revoke`](Self::revoke) is called (when the creator leaves); after
/// that, resolving it fails even if joiners are still attached to the
/// session.
pub struct SessionRegistry<E: RuleEngine, C: Codec = JsonCodec> {
    sessions: RwLock<HashMap<JoinKey, Arc<Session<E, C>>>>,
    codec: C,
    config: SessionConfig,
}

impl<E: RuleEngine + Default> SessionRegistry<E> {
    /// Creates an empty registry using JSON and the default config.
    pub fn with_config(config: SessionConfig) -> Self {
        Self::new(JsonCodec, config)
    }
}

impl<E: RuleEngine + Default> Default for SessionRegistry<E> {
    fn default() -> Self {
        Self::with_config(SessionConfig::default())
    }
}

impl<E: RuleEngine, C: Codec> SessionRegistry<E, C> {
    pub fn new(codec: C, config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            codec,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Looks up the session a join key opens.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] if the key was never issued or has been
    /// revoked.
    pub async fn resolve(&self, key: &JoinKey) -> Result<Arc<Session<E, C>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(key.clone()))
    }

    /// Stops `key` from resolving. Returns `false` if it already didn't.
    ///
    /// Subscribers already attached keep their `Arc<Session>` and can
    /// finish the game; the session is freed when the last one detaches.
    pub async fn revoke(&self, key: &JoinKey) -> bool {
        let removed = self.sessions.write().await.remove(key).is_some();
        if removed {
            tracing::info!(join_key = %key, "join key revoked");
        }
        removed
    }

    /// Number of keys currently resolvable.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl<E: RuleEngine + Default, C: Codec + Clone> SessionRegistry<E, C> {
    /// Starts a new game with `creator` attached as its first subscriber.
    ///
    /// Returns the freshly issued key together with the session. The key
    /// is unique among live sessions: on the (astronomically unlikely)
    /// collision a new one is drawn.
    pub async fn create(&self, creator: Subscriber) -> (JoinKey, Arc<Session<E, C>>) {
        let creator_id = creator.id();
        let mut sessions = self.sessions.write().await;

        let key = loop {
            let candidate = generate_join_key();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
            tracing::warn!(join_key = %candidate, "join key collision, retrying");
        };

        let session = Arc::new(Session::new(
            key.clone(),
            E::default(),
            creator,
            self.codec.clone(),
            self.config.clone(),
        ));
        sessions.insert(key.clone(), Arc::clone(&session));

        tracing::info!(join_key = %key, conn_id = %creator_id, live = sessions.len(), "session created");
        (key, session)
    }
}

/// Draws a 128-bit key rendered as 32 lowercase hex characters.
fn generate_join_key() -> JoinKey {
    let bytes: [u8; 16] = rand::rng().random();
    JoinKey::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}
