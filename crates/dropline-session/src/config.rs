//! Session configuration.

use std::time::Duration;

/// Configuration shared by every session a registry creates.
///
/// You can create a config with `SessionConfig::default()` and then
/// override just the fields you care about.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause between broadcasting the move that ends a game and
    /// broadcasting the win/draw event, so clients can animate the last
    /// disc before the banner appears.
    ///
    /// Default: 500 ms. Zero sends both back to back (still in order).
    pub win_delay: Duration,

    /// Capacity of each connection's outbound queue, in frames.
    ///
    /// A subscriber whose queue is full misses the frame instead of
    /// holding up the broadcast. Direct replies (the `init` key and error
    /// messages) go through the same queue, so a client that stops reading
    /// while still sending bad moves fills it with its own errors and then
    /// misses `play`/`win` frames. Replies wait for space rather than
    /// being dropped. Default: 64.
    pub outbound_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            win_delay: Duration::from_millis(500),
            outbound_capacity: 64,
        }
    }
}
