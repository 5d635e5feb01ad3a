//! A single game: one rule engine plus everyone watching it.
//!
//! Moves are serialized by the engine mutex. The `play` event for an
//! accepted move is fanned out while that mutex is still held, so two
//! moves can never reach a subscriber's queue in a different order than
//! the engine applied them.
//!
//! ```text
//!   submit_move ──lock engine──→ apply_move ──ok──→ broadcast play
//!                                    │                    │
//!                                  error            concluded?
//!                                    │                    │ yes
//!                              back to caller    unlock, sleep win_delay,
//!                                                broadcast win / draw
//! ```

use std::fmt;

use dropline_engine::{Outcome, RuleEngine};
use dropline_protocol::{Codec, JoinKey, JsonCodec, Player, ServerEvent};
use dropline_transport::ConnectionId;
use tokio::sync::{Mutex, RwLock};

use crate::broadcast::{self, Delivery, Subscriber};
use crate::{SessionConfig, SessionError};

/// One live game.
///
/// Shared as `Arc<Session>` between the registry and every connection
/// handler attached to it. Outlives its registry entry if subscribers are
/// still attached when the key is revoked.
pub struct Session<E: RuleEngine, C: Codec = JsonCodec> {
    join_key: JoinKey,
    engine: Mutex<E>,
    subscribers: RwLock<Vec<Subscriber>>,
    codec: C,
    config: SessionConfig,
}

impl<E: RuleEngine, C: Codec> fmt::Debug for Session<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("join_key", &self.join_key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: RuleEngine, C: Codec> Session<E, C> {
    pub(crate) fn new(
        join_key: JoinKey,
        engine: E,
        creator: Subscriber,
        codec: C,
        config: SessionConfig,
    ) -> Self {
        Self {
            join_key,
            engine: Mutex::new(engine),
            subscribers: RwLock::new(vec![creator]),
            codec,
            config,
        }
    }

    pub fn join_key(&self) -> &JoinKey {
        &self.join_key
    }

    /// Adds a connection to the broadcast set.
    ///
    /// Attaching never affects the game: any number of joiners may watch
    /// and play as [`Player::Two`].
    pub async fn attach(&self, subscriber: Subscriber) {
        let mut subscribers = self.subscribers.write().await;
        tracing::debug!(
            join_key = %self.join_key,
            conn_id = %subscriber.id(),
            player = %subscriber.player(),
            "subscriber attached"
        );
        subscribers.push(subscriber);
    }

    /// Removes a connection from the broadcast set and returns how many
    /// subscribers remain. Detaching an unknown id is a no-op.
    pub async fn detach(&self, id: ConnectionId) -> usize {
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|s| s.id() != id);
        tracing::debug!(
            join_key = %self.join_key,
            conn_id = %id,
            remaining = subscribers.len(),
            "subscriber detached"
        );
        subscribers.len()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_concluded(&self) -> bool {
        self.engine.lock().await.is_concluded()
    }

    /// Applies `player`'s move and broadcasts the result.
    ///
    /// On success every subscriber receives `play`, and if the move ended
    /// the game, `win` or `draw` after [`SessionConfig::win_delay`]. This
    /// call returns only after both are queued, and yields the row the
    /// disc landed in.
    ///
    /// # Errors
    ///
    /// [`SessionError::Rejected`] if the engine refused the move. Nothing
    /// is broadcast and the board is unchanged; the caller reports the
    /// message back to the submitter alone.
    pub async fn submit_move(&self, player: Player, column: i64) -> Result<usize, SessionError> {
        let (row, outcome) = {
            let mut engine = self.engine.lock().await;
            let row = engine.apply_move(player, column)?;
            tracing::debug!(join_key = %self.join_key, %player, column, row, "move accepted");
            self.broadcast(&ServerEvent::Play {
                player,
                column,
                row,
            })
            .await?;
            (row, engine.outcome())
        };

        if let Some(outcome) = outcome {
            if !self.config.win_delay.is_zero() {
                tokio::time::sleep(self.config.win_delay).await;
            }
            self.broadcast(&outcome_event(outcome)).await?;
        }

        Ok(row)
    }

    /// Encodes `event` once and offers it to every current subscriber.
    ///
    /// The subscriber list is copied under the read lock and the lock is
    /// released before any frame is offered, so a concurrent attach or
    /// detach never waits on a fan-out.
    pub async fn broadcast(&self, event: &ServerEvent) -> Result<Delivery, SessionError> {
        let frame = broadcast::encode_frame(&self.codec, event)?;
        let snapshot = self.subscribers.read().await.clone();
        let delivery = broadcast::fan_out(&snapshot, &frame);
        if event.is_terminal() {
            tracing::info!(
                join_key = %self.join_key,
                ?event,
                delivered = delivery.delivered,
                "game concluded"
            );
        }
        if delivery.dropped > 0 {
            tracing::warn!(
                join_key = %self.join_key,
                dropped = delivery.dropped,
                delivered = delivery.delivered,
                "broadcast missed some subscribers"
            );
        }
        Ok(delivery)
    }
}

fn outcome_event(outcome: Outcome) -> ServerEvent {
    match outcome {
        Outcome::Winner(player) => ServerEvent::Win { player },
        Outcome::Draw => ServerEvent::Draw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use dropline_engine::{ConnectFour, EngineError};
    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    use crate::Frame;

    fn config(win_delay: Duration) -> SessionConfig {
        SessionConfig {
            win_delay,
            ..SessionConfig::default()
        }
    }

    fn subscriber(id: u64, player: Player) -> (Subscriber, mpsc::Receiver<Frame>) {
        subscriber_with_capacity(id, player, 32)
    }

    fn subscriber_with_capacity(
        id: u64,
        player: Player,
        capacity: usize,
    ) -> (Subscriber, mpsc::Receiver<Frame>) {
        let (tx, rx) = broadcast::outbound_channel(capacity);
        (Subscriber::new(ConnectionId::new(id), player, tx), rx)
    }

    /// Enforces turns and stacks discs, but never ends the game.
    #[derive(Default)]
    struct EndlessBoard {
        two_to_move: bool,
        heights: [usize; 7],
    }

    impl RuleEngine for EndlessBoard {
        fn apply_move(&mut self, player: Player, column: i64) -> Result<usize, EngineError> {
            let expected = if self.two_to_move { Player::Two } else { Player::One };
            if player != expected {
                return Err(EngineError::NotYourTurn);
            }
            let Some(height) = usize::try_from(column)
                .ok()
                .and_then(|c| self.heights.get_mut(c))
            else {
                return Err(EngineError::InvalidColumn(column));
            };
            let row = *height;
            *height += 1;
            self.two_to_move = !self.two_to_move;
            Ok(row)
        }

        fn outcome(&self) -> Option<Outcome> {
            None
        }
    }

    /// A session with the creator attached as conn 1 and a joiner as conn 2.
    async fn two_player_session(
        win_delay: Duration,
    ) -> (
        Session<ConnectFour>,
        mpsc::Receiver<Frame>,
        mpsc::Receiver<Frame>,
    ) {
        let (creator, rx1) = subscriber(1, Player::One);
        let (joiner, rx2) = subscriber(2, Player::Two);
        let session = Session::new(
            JoinKey::new("k"),
            ConnectFour::new(),
            creator,
            JsonCodec,
            config(win_delay),
        );
        session.attach(joiner).await;
        (session, rx1, rx2)
    }

    fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_slice(&frame).unwrap());
        }
        out
    }

    // =====================================================================
    // Membership
    // =====================================================================

    #[tokio::test]
    async fn test_attach_and_detach_track_count() {
        let (session, _rx1, _rx2) = two_player_session(Duration::ZERO).await;
        assert_eq!(session.subscriber_count().await, 2);

        assert_eq!(session.detach(ConnectionId::new(2)).await, 1);
        assert_eq!(session.detach(ConnectionId::new(2)).await, 1);
        assert_eq!(session.detach(ConnectionId::new(1)).await, 0);
    }

    #[tokio::test]
    async fn test_detached_subscriber_stops_receiving_but_others_continue() {
        let (session, mut rx1, mut rx2) = two_player_session(Duration::ZERO).await;

        session.detach(ConnectionId::new(2)).await;
        session.submit_move(Player::One, 3).await.unwrap();

        assert_eq!(drain(&mut rx1).len(), 1);
        assert!(drain(&mut rx2).is_empty());
    }

    // =====================================================================
    // submit_move()
    // =====================================================================

    #[tokio::test]
    async fn test_accepted_move_reaches_every_subscriber() {
        let (session, mut rx1, mut rx2) = two_player_session(Duration::ZERO).await;

        let row = session.submit_move(Player::One, 3).await.unwrap();
        assert_eq!(row, 0);

        let expected = json!({"type": "play", "player": 1, "column": 3, "row": 0});
        assert_eq!(drain(&mut rx1), vec![expected.clone()]);
        assert_eq!(drain(&mut rx2), vec![expected]);
    }

    #[tokio::test]
    async fn test_rejected_move_is_not_broadcast() {
        let (session, mut rx1, mut rx2) = two_player_session(Duration::ZERO).await;

        let err = session.submit_move(Player::Two, 3).await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(EngineError::NotYourTurn)));

        let err = session.submit_move(Player::One, 7).await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(EngineError::InvalidColumn(7))));

        assert!(drain(&mut rx1).is_empty());
        assert!(drain(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn test_winning_move_sends_play_then_win() {
        let (session, mut rx1, mut rx2) = two_player_session(Duration::ZERO).await;

        for (player, column) in [
            (Player::One, 0),
            (Player::Two, 1),
            (Player::One, 0),
            (Player::Two, 1),
            (Player::One, 0),
            (Player::Two, 1),
        ] {
            session.submit_move(player, column).await.unwrap();
        }
        drain(&mut rx1);
        drain(&mut rx2);

        session.submit_move(Player::One, 0).await.unwrap();
        assert!(session.is_concluded().await);

        let expected = vec![
            json!({"type": "play", "player": 1, "column": 0, "row": 3}),
            json!({"type": "win", "player": 1}),
        ];
        assert_eq!(drain(&mut rx1), expected);
        assert_eq!(drain(&mut rx2), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_win_is_delayed_after_final_play() {
        let delay = Duration::from_millis(500);
        let (session, mut rx1, _rx2) = two_player_session(delay).await;

        for (player, column) in [
            (Player::One, 0),
            (Player::Two, 1),
            (Player::One, 0),
            (Player::Two, 1),
            (Player::One, 0),
            (Player::Two, 1),
        ] {
            session.submit_move(player, column).await.unwrap();
        }
        drain(&mut rx1);

        let started = tokio::time::Instant::now();
        session.submit_move(Player::One, 0).await.unwrap();
        assert!(started.elapsed() >= delay);

        let events = drain(&mut rx1);
        assert_eq!(events[0]["type"], "play");
        assert_eq!(events[1]["type"], "win");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ordinary_move_is_not_delayed() {
        let (session, _rx1, _rx2) = two_player_session(Duration::from_secs(10)).await;

        let started = tokio::time::Instant::now();
        session.submit_move(Player::One, 0).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_moves_after_conclusion_are_rejected_silently() {
        let (session, mut rx1, _rx2) = two_player_session(Duration::ZERO).await;
        for (player, column) in [
            (Player::One, 0),
            (Player::Two, 1),
            (Player::One, 0),
            (Player::Two, 1),
            (Player::One, 0),
            (Player::Two, 1),
            (Player::One, 0),
        ] {
            session.submit_move(player, column).await.unwrap();
        }
        drain(&mut rx1);

        let err = session.submit_move(Player::Two, 2).await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(EngineError::GameOver)));
        assert!(drain(&mut rx1).is_empty());
    }

    #[tokio::test]
    async fn test_closed_subscriber_does_not_fail_the_move() {
        let (session, mut rx1, rx2) = two_player_session(Duration::ZERO).await;
        drop(rx2);

        session.submit_move(Player::One, 4).await.unwrap();
        assert_eq!(drain(&mut rx1).len(), 1);
    }

    // =====================================================================
    // broadcast()
    // =====================================================================

    #[tokio::test]
    async fn test_broadcast_reports_delivery() {
        let (session, _rx1, rx2) = two_player_session(Duration::ZERO).await;
        drop(rx2);

        let delivery = session.broadcast(&ServerEvent::Draw).await.unwrap();
        assert_eq!(delivery, Delivery { delivered: 1, dropped: 1 });
    }

    #[test]
    fn test_outcome_event_mapping() {
        assert_eq!(
            outcome_event(Outcome::Winner(Player::Two)),
            ServerEvent::Win { player: Player::Two }
        );
        assert_eq!(outcome_event(Outcome::Draw), ServerEvent::Draw);
    }

    #[tokio::test]
    async fn test_debug_shows_join_key() {
        let (session, _rx1, _rx2) = two_player_session(Duration::ZERO).await;
        let shown = format!("{session:?}");
        assert!(shown.starts_with("Session"));
        assert!(shown.contains(r#""k""#));
    }

    #[tokio::test]
    async fn test_full_queue_misses_play_but_others_receive_it() {
        let (creator, mut rx1) = subscriber(1, Player::One);
        let (tx, mut rx_full) = broadcast::outbound_channel(1);
        let session = Session::new(
            JoinKey::new("k"),
            ConnectFour::new(),
            creator,
            JsonCodec,
            config(Duration::ZERO),
        );
        session
            .attach(Subscriber::new(ConnectionId::new(2), Player::Two, tx.clone()))
            .await;

        // An unread error reply fills the one-frame queue.
        broadcast::unicast(&JsonCodec, &tx, &ServerEvent::error("Invalid move."))
            .await
            .unwrap();
        session.submit_move(Player::One, 0).await.unwrap();

        assert_eq!(drain(&mut rx1).len(), 1);
        assert_eq!(
            drain(&mut rx_full),
            vec![json!({"type": "error", "message": "Invalid move."})]
        );
    }

    // =====================================================================
    // Concurrency
    // =====================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_for_one_turn_accept_exactly_one() {
        const CONTENDERS: usize = 6;
        let (session, mut rx1, mut rx2) = two_player_session(Duration::ZERO).await;
        session.submit_move(Player::One, 3).await.unwrap();

        // Every joiner plays as Player Two, so they all race for one turn.
        let session = Arc::new(session);
        let barrier = Arc::new(tokio::sync::Barrier::new(CONTENDERS));
        let tasks: Vec<_> = (0..CONTENDERS as i64)
            .map(|column| {
                let session = Arc::clone(&session);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    session.submit_move(Player::Two, column).await
                })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => assert!(matches!(e, SessionError::Rejected(EngineError::NotYourTurn))),
            }
        }
        assert_eq!(accepted, 1);

        for rx in [&mut rx1, &mut rx2] {
            let events = drain(rx);
            assert_eq!(events.len(), 2);
            assert_eq!(events[1]["player"], 2);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_players_keep_turns_and_rows_consistent() {
        const MOVES_EACH: usize = 25;
        let (creator, mut rx1) = subscriber_with_capacity(1, Player::One, 128);
        let (joiner, mut rx2) = subscriber_with_capacity(2, Player::Two, 128);
        let session = Arc::new(Session::new(
            JoinKey::new("race"),
            EndlessBoard::default(),
            creator,
            JsonCodec,
            config(Duration::ZERO),
        ));
        session.attach(joiner).await;

        let tasks: Vec<_> = [Player::One, Player::Two]
            .into_iter()
            .map(|player| {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    let mut accepted = 0;
                    let mut attempt: i64 = 0;
                    while accepted < MOVES_EACH {
                        match session.submit_move(player, attempt % 7).await {
                            Ok(_) => accepted += 1,
                            Err(SessionError::Rejected(EngineError::NotYourTurn)) => {
                                tokio::task::yield_now().await;
                            }
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                        attempt += 1;
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let feed = drain(&mut rx1);
        assert_eq!(feed.len(), 2 * MOVES_EACH);
        assert_eq!(feed, drain(&mut rx2));

        let mut heights = [0u64; 7];
        for (i, event) in feed.iter().enumerate() {
            assert_eq!(event["type"], "play");
            assert_eq!(event["player"], if i % 2 == 0 { 1 } else { 2 });
            let column = event["column"].as_u64().unwrap() as usize;
            assert_eq!(event["row"], heights[column]);
            heights[column] += 1;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_broadcast_reaches_survivors_while_others_churn() {
        const FRAMES: usize = 200;
        let (creator, mut rx1) = subscriber_with_capacity(1, Player::One, FRAMES);
        let (joiner, mut rx2) = subscriber_with_capacity(2, Player::Two, FRAMES);
        let session = Arc::new(Session::new(
            JoinKey::new("churn"),
            ConnectFour::new(),
            creator,
            JsonCodec,
            config(Duration::ZERO),
        ));
        session.attach(joiner).await;

        let churn = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let mut kept = Vec::new();
                for id in 100..400u64 {
                    let (sub, rx) = subscriber_with_capacity(id, Player::Two, 1);
                    session.attach(sub).await;
                    // Half leave with their queue already gone, half with it full.
                    if id % 2 == 0 {
                        drop(rx);
                    } else {
                        kept.push(rx);
                    }
                    tokio::task::yield_now().await;
                    session.detach(ConnectionId::new(id)).await;
                }
            })
        };

        for _ in 0..FRAMES {
            session.broadcast(&ServerEvent::Draw).await.unwrap();
            tokio::task::yield_now().await;
        }
        churn.await.unwrap();

        assert_eq!(session.subscriber_count().await, 2);
        for rx in [&mut rx1, &mut rx2] {
            assert_eq!(drain(rx).len(), FRAMES);
        }
    }
}
