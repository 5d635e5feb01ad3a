//! Per-connection handler: role selection, then move routing.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that owns the socket's send half. The flow is:
//!   1. Finish the WebSocket upgrade, then wait for one `init` message,
//!      each bounded by `init_timeout`
//!   2. No join key → create a session, reply with its key, play as P1.
//!      Join key → attach to that session as P2, or reply
//!      "Game not found." and hang up
//!   3. Loop: decode `{column}` → submit to the session; rule violations
//!      go back to this connection only
//!   4. On any exit, the seat guard detaches from the session and, for the
//!      creator, revokes the join key

use std::sync::Arc;
use std::time::Duration;

use dropline_engine::RuleEngine;
use dropline_protocol::{Codec, InitRequest, MoveRequest, Player, ServerEvent};
use dropline_session::{Frame, Session, Subscriber, outbound_channel, spawn_writer, unicast};
use dropline_transport::{Connection, ConnectionId, Pending, PendingWebSocket, WebSocketConnection};
use tokio::sync::mpsc;

use crate::DroplineError;
use crate::server::ServerState;

/// Sent when the first message is not a valid `init`.
pub const INVALID_INIT: &str = "Invalid init message.";
/// Sent when a join key does not resolve.
pub const NOT_FOUND: &str = "Game not found.";
/// Sent when an in-game message is not a `{column}` record.
pub const INVALID_MOVE: &str = "Invalid move.";

/// Drop guard that gives up a connection's seat when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async locks.
struct SeatGuard<E: RuleEngine, C: Codec> {
    conn_id: ConnectionId,
    session: Arc<Session<E, C>>,
    /// Set for the creator, whose departure revokes the join key.
    revoke_from: Option<Arc<ServerState<E, C>>>,
}

impl<E: RuleEngine, C: Codec> Drop for SeatGuard<E, C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let session = Arc::clone(&self.session);
        let revoke_from = self.revoke_from.take();
        tokio::spawn(async move {
            if let Some(state) = revoke_from {
                state.registry.revoke(session.join_key()).await;
            }
            let remaining = session.detach(conn_id).await;
            tracing::info!(
                %conn_id,
                join_key = %session.join_key(),
                remaining,
                "left session"
            );
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<E, C>(
    pending: PendingWebSocket,
    state: Arc<ServerState<E, C>>,
) -> Result<(), DroplineError>
where
    E: RuleEngine + Default,
    C: Codec + Clone,
{
    let conn_id = pending.id();
    let conn = match tokio::time::timeout(state.init_timeout, pending.upgrade()).await {
        Ok(Ok(conn)) => Arc::new(conn),
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            tracing::info!(%conn_id, timeout = ?state.init_timeout, "handshake timed out");
            return Ok(());
        }
    };
    tracing::debug!(%conn_id, "handling new connection");

    let (outbound, rx) = outbound_channel(state.registry.config().outbound_capacity);
    let writer = spawn_writer(Arc::clone(&conn), rx);

    let result = serve(&conn, &state, outbound).await;

    // The writer stops once the session's copy of the sender is gone too,
    // which happens when the seat guard's detach has run.
    if let Err(e) = writer.await {
        tracing::warn!(%conn_id, error = %e, "writer task failed");
    }
    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after writer stopped");
    }

    result
}

/// Runs role selection and the move loop. Returning drops `outbound` and
/// the seat guard.
async fn serve<E, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<E, C>>,
    outbound: mpsc::Sender<Frame>,
) -> Result<(), DroplineError>
where
    E: RuleEngine + Default,
    C: Codec + Clone,
{
    let conn_id = conn.id();

    let Some(data) = receive_init(conn, state.init_timeout).await? else {
        return Ok(());
    };

    let request: InitRequest = match state.codec.decode(&data) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "rejecting malformed init");
            unicast(&state.codec, &outbound, &ServerEvent::error(INVALID_INIT)).await?;
            return Err(e.into());
        }
    };

    let (player, guard) = match request.into_join_key() {
        None => {
            let subscriber = Subscriber::new(conn_id, Player::One, outbound.clone());
            let (key, session) = state.registry.create(subscriber).await;
            let guard = SeatGuard {
                conn_id,
                session,
                revoke_from: Some(Arc::clone(state)),
            };
            unicast(&state.codec, &outbound, &ServerEvent::Init { join: key }).await?;
            (Player::One, guard)
        }
        Some(key) => match state.registry.resolve(&key).await {
            Ok(session) => {
                let subscriber = Subscriber::new(conn_id, Player::Two, outbound.clone());
                session.attach(subscriber).await;
                tracing::info!(%conn_id, join_key = %key, "joined session");
                let guard = SeatGuard {
                    conn_id,
                    session,
                    revoke_from: None,
                };
                (Player::Two, guard)
            }
            Err(e) => {
                tracing::info!(%conn_id, join_key = %key, "join refused");
                unicast(&state.codec, &outbound, &ServerEvent::error(NOT_FOUND)).await?;
                return Err(e.into());
            }
        },
    };
    let session = Arc::clone(&guard.session);

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, %player, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, %player, error = %e, "recv error");
                break;
            }
        };

        let request: MoveRequest = match state.codec.decode(&data) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode move");
                unicast(&state.codec, &outbound, &ServerEvent::error(INVALID_MOVE)).await?;
                continue;
            }
        };

        match session.submit_move(player, request.column).await {
            Ok(_) => {}
            Err(e) if e.is_rejection() => {
                tracing::debug!(%conn_id, %player, column = request.column, reason = %e, "move rejected");
                unicast(&state.codec, &outbound, &ServerEvent::error(&e)).await?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    // guard drops here → detach (and revoke, for the creator) fires.
    Ok(())
}

/// Waits up to `timeout` for the first message.
///
/// Returns `Ok(None)` if the peer hangs up or stays silent; neither gets a
/// reply.
async fn receive_init(
    conn: &WebSocketConnection,
    timeout: Duration,
) -> Result<Option<Vec<u8>>, DroplineError> {
    match tokio::time::timeout(timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => Ok(Some(data)),
        Ok(Ok(None)) => {
            tracing::debug!(conn_id = %conn.id(), "connection closed before init");
            Ok(None)
        }
        Ok(Err(e)) => Err(DroplineError::Transport(e)),
        Err(_) => {
            tracing::info!(conn_id = %conn.id(), ?timeout, "init timed out");
            Ok(None)
        }
    }
}
