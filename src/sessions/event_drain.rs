use std::collections::vec_deque::IntoIter;
use std::collections::VecDeque;
use std::iter::FusedIterator;

use crate::RevealEvent;

/// An opaque iterator over the events taken from a session's queue.
///
/// The session hands over its whole queue at once, so the drain owns its
/// events and the session can keep recording while the caller iterates.
/// Implements [`Iterator`], [`DoubleEndedIterator`], [`ExactSizeIterator`] and
/// [`FusedIterator`].
///
/// Obtain one from [`GameSession::events`].
///
/// # Examples
///
/// ```ignore
/// for event in session.events() {
///     match event {
///         RevealEvent::LaneRevealed { lane, .. } => highlight(lane),
///         _ => {}
///     }
/// }
/// ```
///
/// [`GameSession::events`]: crate::GameSession::events
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct EventDrain {
    inner: IntoIter<RevealEvent>,
}

impl EventDrain {
    pub(crate) fn from_queue(queue: VecDeque<RevealEvent>) -> Self {
        Self {
            inner: queue.into_iter(),
        }
    }
}

impl Iterator for EventDrain {
    type Item = RevealEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for EventDrain {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl ExactSizeIterator for EventDrain {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl FusedIterator for EventDrain {}

impl std::fmt::Debug for EventDrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDrain")
            .field("remaining", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::{GameId, Lane};

    fn started(game: u64) -> RevealEvent {
        RevealEvent::Started {
            game: GameId::new(game),
        }
    }

    fn queue_of(games: &[u64]) -> VecDeque<RevealEvent> {
        games.iter().copied().map(started).collect()
    }

    #[test]
    fn empty_queue_yields_nothing() {
        let mut drain = EventDrain::from_queue(VecDeque::new());
        assert_eq!(drain.len(), 0);
        assert!(drain.next().is_none());
    }

    #[test]
    fn yields_events_in_order_and_is_fused() {
        let mut drain = EventDrain::from_queue(queue_of(&[1, 2]));
        assert_eq!(drain.next(), Some(started(1)));
        assert_eq!(drain.next(), Some(started(2)));
        assert!(drain.next().is_none());
        assert!(drain.next().is_none());
    }

    #[test]
    fn double_ended_and_exact_size() {
        let mut queue = queue_of(&[1]);
        queue.push_back(RevealEvent::LaneRevealed {
            game: GameId::new(1),
            lane: Lane::new(0),
        });
        queue.push_back(started(3));

        let mut drain = EventDrain::from_queue(queue);
        assert_eq!(drain.len(), 3);
        assert_eq!(drain.next_back(), Some(started(3)));
        assert_eq!(drain.len(), 2);
        assert_eq!(drain.next(), Some(started(1)));
        assert!(matches!(
            drain.next(),
            Some(RevealEvent::LaneRevealed { .. })
        ));
    }

    #[test]
    fn debug_format_shows_remaining_count() {
        let drain = EventDrain::from_queue(queue_of(&[1, 2]));
        assert_eq!(format!("{drain:?}"), "EventDrain { remaining: 2 }");
    }
}
