//! `DroplineServer` builder and server loop.
//!
//! This is the entry point for running a Dropline server. It ties
//! together all the layers: transport → handler → session → engine.

use std::sync::Arc;
use std::time::Duration;

use dropline_engine::RuleEngine;
use dropline_protocol::{Codec, JsonCodec};
use dropline_session::{SessionConfig, SessionRegistry};
use dropline_transport::{Transport, WebSocketTransport};

use crate::DroplineError;
use crate::handler::handle_connection;

/// Address the server binds to unless told otherwise.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8010";

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<E: RuleEngine, C: Codec> {
    pub(crate) registry: SessionRegistry<E, C>,
    pub(crate) codec: C,
    pub(crate) init_timeout: Duration,
}

/// Builder for configuring and starting a Dropline server.
///
/// # Example
///
/// ```rust,ignore
/// use dropline::prelude::*;
///
/// let server = DroplineServer::builder()
///     .bind("127.0.0.1:0")
///     .session_config(SessionConfig { win_delay: Duration::ZERO, ..Default::default() })
///     .build::<ConnectFour>()
///     .await?;
/// server.run().await
/// ```
pub struct DroplineServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    init_timeout: Duration,
}

impl DroplineServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            session_config: SessionConfig::default(),
            init_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every new session gets.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets how long a new connection may take to finish the WebSocket
    /// handshake, and then again to send its `init`.
    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Binds the listener and builds a server for rule engine `E`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`, which is what browsers
    /// speak.
    pub async fn build<E: RuleEngine + Default>(
        self,
    ) -> Result<DroplineServer<E, JsonCodec>, DroplineError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: SessionRegistry::new(JsonCodec, self.session_config),
            codec: JsonCodec,
            init_timeout: self.init_timeout,
        });

        Ok(DroplineServer { transport, state })
    }
}

impl Default for DroplineServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Dropline server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DroplineServer<E: RuleEngine, C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<E, C>>,
}

impl DroplineServer<dropline_engine::ConnectFour> {
    /// Creates a new builder.
    pub fn builder() -> DroplineServerBuilder {
        DroplineServerBuilder::new()
    }
}

impl<E, C> DroplineServer<E, C>
where
    E: RuleEngine + Default,
    C: Codec + Clone,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted stream; the WebSocket
    /// handshake runs on that task, never on this loop. A failed accept
    /// or a failed connection is logged and the loop carries on; this only
    /// returns if the process is terminated.
    pub async fn run(mut self) -> Result<(), DroplineError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Dropline server running");

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection::<E, C>(pending, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
