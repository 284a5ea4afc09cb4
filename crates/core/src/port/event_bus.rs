//! Event fan-out port.
//!
//! Lifecycle events are multicast to named rooms; the live-push transport
//! that delivers them to subscribers is an external collaborator. There is a
//! race between update emissions and the initial snapshot a new subscriber
//! fetches: updates for an object may arrive before its initial data, which
//! may or may not have the update applied already. The transport therefore
//! checks existence, joins the room, then re-fetches and pushes an `_init`
//! snapshot; subscribers buffer updates that arrive before `_init` and apply
//! them afterwards.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A named multicast channel. Every emit to a specific room is mirrored to
/// `monitor` by the bus implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    Monitor,
    Jobs,
    Submissions,
    Job(i64),
    Submission(i64),
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Room::Monitor => f.write_str("monitor"),
            Room::Jobs => f.write_str("jobs"),
            Room::Submissions => f.write_str("submissions"),
            Room::Job(id) => write!(f, "job_{}", id),
            Room::Submission(id) => write!(f, "submission_{}", id),
        }
    }
}

/// One lifecycle event addressed to a set of rooms.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: &'static str,
    pub rooms: Vec<Room>,
    pub payload: Value,
}

impl Event {
    pub fn new(name: &'static str, rooms: Vec<Room>, payload: Value) -> Self {
        Self {
            name,
            rooms,
            payload,
        }
    }
}

/// Publisher side of the fan-out. Implementations must be effectively
/// non-blocking; the engine treats publish failures as non-fatal.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: Event) -> Result<()>;
}

/// Bus used when live push is disabled by configuration.
pub struct NullEventBus;

#[async_trait]
impl EventBus for NullEventBus {
    async fn publish(&self, _event: Event) -> Result<()> {
        Ok(())
    }
}

pub mod mocks {
    use super::{Event, EventBus};
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every published event so tests can inspect the traffic.
    #[derive(Default)]
    pub struct RecordingEventBus {
        published: Mutex<Vec<Event>>,
    }

    impl RecordingEventBus {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn published(&self) -> Vec<Event> {
            self.published
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        }

        pub fn events_named(&self, name: &str) -> Vec<Event> {
            self.published()
                .into_iter()
                .filter(|e| e.name == name)
                .collect()
        }

        pub fn was_published(&self, name: &str) -> bool {
            !self.events_named(name).is_empty()
        }
    }

    #[async_trait]
    impl EventBus for RecordingEventBus {
        async fn publish(&self, event: Event) -> Result<()> {
            self.published
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event);
            Ok(())
        }
    }
}
