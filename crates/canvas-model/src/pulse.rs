//! Transient visual events

use crate::id::PulseId;
use crate::node::Position;

/// A short-lived visual event at a canvas position
///
/// Pulses expire on their own and are never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    /// Identity, unique within a session
    pub id: PulseId,
    /// Where the pulse is drawn
    pub position: Position,
    /// Emission time on the session clock, in milliseconds
    pub timestamp_ms: u64,
}

impl Pulse {
    /// Create a pulse
    #[inline]
    #[must_use]
    pub fn new(id: PulseId, position: Position, timestamp_ms: u64) -> Self {
        Self {
            id,
            position,
            timestamp_ms,
        }
    }
}
