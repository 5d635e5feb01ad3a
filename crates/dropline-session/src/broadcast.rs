//! Fan-out of encoded events to connection outbound queues.
//!
//! Every connection gets a bounded `mpsc` queue of [`Frame`]s and a writer
//! task that drains it into the socket. Sessions never touch sockets: they
//! encode an event once and offer the same frame to each subscriber's
//! queue with `try_send`. A subscriber whose queue is full or closed misses
//! that frame, and nobody else notices.

use std::sync::Arc;

use dropline_protocol::{Codec, Player, ProtocolError, ServerEvent};
use dropline_transport::{Connection, ConnectionId};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// One encoded event, shared by every queue it is offered to.
pub type Frame = Arc<[u8]>;

/// Creates a connection's outbound queue.
pub fn outbound_channel(capacity: usize) -> (mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
    mpsc::channel(capacity.max(1))
}

/// Encodes `event` into a shareable frame.
pub fn encode_frame<C: Codec>(codec: &C, event: &ServerEvent) -> Result<Frame, ProtocolError> {
    Ok(Frame::from(codec.encode(event)?))
}

/// A connection attached to a session: who it is, which seat it plays,
/// and where its frames go.
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: ConnectionId,
    player: Player,
    outbound: mpsc::Sender<Frame>,
}

impl Subscriber {
    pub fn new(id: ConnectionId, player: Player, outbound: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            player,
            outbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn player(&self) -> Player {
        self.player
    }

    /// Offers `frame` without waiting. Returns `false` if it was dropped.
    pub fn offer(&self, frame: &Frame) -> bool {
        match self.outbound.try_send(Arc::clone(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "outbound queue full, dropping frame");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(conn_id = %self.id, "outbound queue closed, dropping frame");
                false
            }
        }
    }
}

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers whose queue accepted the frame.
    pub delivered: usize,
    /// Subscribers that were full or gone.
    pub dropped: usize,
}

/// Offers `frame` to every subscriber in `subscribers`.
///
/// Never blocks and never stops early.
pub fn fan_out(subscribers: &[Subscriber], frame: &Frame) -> Delivery {
    subscribers
        .iter()
        .fold(Delivery::default(), |mut delivery, subscriber| {
            if subscriber.offer(frame) {
                delivery.delivered += 1;
            } else {
                delivery.dropped += 1;
            }
            delivery
        })
}

/// Queues `event` for one connection only.
///
/// Used for `init` and `error` events. Unlike a broadcast this waits for
/// queue space, since the frame is the connection's own reply. A closed
/// queue means the writer is gone; that is logged and not an error.
pub async fn unicast<C: Codec>(
    codec: &C,
    outbound: &mpsc::Sender<Frame>,
    event: &ServerEvent,
) -> Result<(), ProtocolError> {
    let frame = encode_frame(codec, event)?;
    if outbound.send(frame).await.is_err() {
        tracing::debug!(?event, "outbound queue closed, unicast dropped");
    }
    Ok(())
}

/// Spawns the task that drains `outbound` into `conn`.
///
/// The task ends when every sender for the queue is gone (the handler has
/// exited and the session has detached the subscriber), or on the first
/// failed send, since a dead socket will not come back.
pub fn spawn_writer<C: Connection>(conn: Arc<C>, mut outbound: mpsc::Receiver<Frame>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = conn.send(&frame).await {
                tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
                break;
            }
        }
        tracing::trace!(conn_id = %conn.id(), "writer stopped");
    })
}
