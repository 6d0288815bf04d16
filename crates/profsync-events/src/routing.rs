//! Event bus routing helpers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast::Sender;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    replay: Arc<Mutex<VecDeque<EventEnvelope>>>,
    replay_capacity: usize,
    next_id: Arc<Mutex<EventId>>,
    taps: Arc<Mutex<Vec<mpsc::UnboundedSender<EventEnvelope>>>>,
}

impl EventBus {
    /// Construct a bus with a custom replay capacity (at least one slot).
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        let replay_capacity = replay_capacity.max(1);
        let (sender, _) = broadcast::channel(replay_capacity);
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(replay_capacity))),
            replay_capacity,
            next_id: Arc::new(Mutex::new(1)),
            taps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Subscribe to the bus. When `last_event_id` is set, buffered events newer
    /// than it are yielded before live ones.
    #[must_use]
    pub fn subscribe(&self, last_event_id: Option<EventId>) -> EventStream {
        // Subscribe before snapshotting so nothing published in between is lost.
        let live = BroadcastStream::new(self.sender.subscribe());
        let backlog: VecDeque<EventEnvelope> = last_event_id
            .map(|last| self.backlog_since(last).into())
            .unwrap_or_default();
        let replayed_up_to = backlog.back().map(|env| env.id);
        EventStream {
            backlog,
            replayed_up_to,
            live,
        }
    }

    /// Lossless subscription: every event published after the call is queued
    /// for the tap regardless of how far its reader falls behind. When
    /// `last_event_id` is set, buffered events newer than it come first.
    #[must_use]
    pub fn tap(&self, last_event_id: Option<EventId>) -> EventTap {
        // Holding the id lock keeps publishers out between snapshot and registration.
        let next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
        let backlog: VecDeque<EventEnvelope> = last_event_id
            .map(|last| self.backlog_since(last).into())
            .unwrap_or_default();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock_taps().push(sender);
        drop(next);
        EventTap { backlog, receiver }
    }

    /// Publish a new event to all subscribers, returning its identifier.
    pub fn publish(&self, event: Event) -> EventId {
        // The id lock is held until the envelope is queued so replay order matches ids.
        let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
        let id = *next;
        *next = next.saturating_add(1);

        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        {
            let mut replay = self.lock_replay();
            if replay.len() == self.replay_capacity {
                let _ = replay.pop_front();
            }
            replay.push_back(envelope.clone());
        }
        self.lock_taps()
            .retain(|tap| tap.send(envelope.clone()).is_ok());
        let _ = self.sender.send(envelope);
        drop(next);
        id
    }

    /// Last event id observed in the replay buffer.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_replay().back().map(|env| env.id)
    }

    /// Collect a backlog of events emitted after the specified id.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        let replay = self.lock_replay();
        replay.iter().filter(|env| env.id > id).cloned().collect()
    }

    fn lock_taps(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<EventEnvelope>>> {
        self.taps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.replay.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Lossless subscriber handle created by [`EventBus::tap`].
pub struct EventTap {
    backlog: VecDeque<EventEnvelope>,
    receiver: mpsc::UnboundedReceiver<EventEnvelope>,
}

impl EventTap {
    /// Receive the next event, or `None` once every bus handle is dropped.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        match self.backlog.pop_front() {
            Some(envelope) => Some(envelope),
            None => self.receiver.recv().await,
        }
    }
}

/// Subscriber handle yielding replayed events first, then live ones.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    replayed_up_to: Option<EventId>,
    live: BroadcastStream<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, or `None` once every bus handle is dropped.
    ///
    /// Events missed because the subscriber lagged are skipped with a warning.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.backlog.pop_front() {
            return Some(envelope);
        }
        loop {
            match self.live.next().await? {
                Ok(envelope) => {
                    if self
                        .replayed_up_to
                        .is_some_and(|replayed| envelope.id <= replayed)
                    {
                        continue;
                    }
                    return Some(envelope);
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged; events dropped");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::MarkerStatus;
    use std::time::Duration;
    use tokio::time::timeout;

    fn skipped(stage: &str) -> Event {
        Event::StageSkipped {
            stage: stage.into(),
            reason: "declined".into(),
        }
    }

    #[tokio::test]
    async fn publish_assigns_sequential_ids_and_replays_from_id() {
        let bus = EventBus::with_capacity(4);
        let first = bus.publish(skipped("program files"));
        let second = bus.publish(Event::MarkerProcessed {
            path: "Desktop/a.url".into(),
            status: MarkerStatus::Absent,
        });

        assert_eq!((first, second), (1, 2));
        assert_eq!(bus.last_event_id(), Some(second));
        let backlog = bus.backlog_since(first);
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].id, second);
    }

    #[tokio::test]
    async fn replay_ring_drops_oldest_when_full() {
        let bus = EventBus::with_capacity(2);
        for stage in ["a", "b", "c"] {
            let _ = bus.publish(skipped(stage));
        }
        let ids: Vec<_> = bus.backlog_since(0).iter().map(|env| env.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn tap_replays_then_queues_everything_published_later() {
        let bus = EventBus::with_capacity(2);
        let _ = bus.publish(skipped("a"));
        let mut tap = bus.tap(Some(0));
        for stage in ["b", "c", "d", "e"] {
            let _ = bus.publish(skipped(stage));
        }

        let mut ids = Vec::new();
        for _ in 0..5 {
            if let Ok(Some(envelope)) = timeout(Duration::from_secs(1), tap.next()).await {
                ids.push(envelope.id);
            }
        }
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn subscriber_sees_backlog_then_live_without_duplicates() {
        let bus = EventBus::new();
        let _ = bus.publish(skipped("a"));
        let second = bus.publish(skipped("b"));

        let mut stream = bus.subscribe(Some(0));
        let third = bus.publish(skipped("c"));

        let mut ids = Vec::new();
        for _ in 0..3 {
            let envelope = timeout(Duration::from_secs(1), stream.next())
                .await
                .expect("event within timeout")
                .expect("bus still open");
            ids.push(envelope.id);
        }
        assert_eq!(ids, vec![1, second, third]);
    }

    #[tokio::test]
    async fn stream_ends_when_bus_dropped() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe(None);
        drop(bus);
        assert!(stream.next().await.is_none());
    }
}
