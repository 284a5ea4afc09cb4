// Redis-backed room fan-out.
//
// Each room maps to a pub/sub channel `room:<name>`; the live-push
// transport subscribes on the other side and relays into its own rooms.
// Emits to a specific room are mirrored to `monitor`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::json;

use judge_core::error::{AppError, Result};
use judge_core::port::{Event, EventBus, Room};

pub struct RedisEventBus {
    conn: ConnectionManager,
}

impl RedisEventBus {
    /// Connect to the backplane. The connection manager reconnects on its
    /// own, so a momentary redis outage only drops events.
    pub async fn connect(redis_uri: &str) -> Result<Self> {
        let client = redis::Client::open(redis_uri)
            .map_err(|e| AppError::Config(format!("Bad redis URI: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::EventBus(e.to_string()))?;
        Ok(Self { conn })
    }

    fn channel(room: &Room) -> String {
        format!("room:{}", room)
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, event: Event) -> Result<()> {
        let message = serde_json::to_string(&json!({
            "event": event.name,
            "payload": event.payload,
        }))?;

        let mut rooms = event.rooms;
        if !rooms.contains(&Room::Monitor) {
            rooms.push(Room::Monitor);
        }

        let mut conn = self.conn.clone();
        for room in &rooms {
            conn.publish::<_, _, ()>(Self::channel(room), &message)
                .await
                .map_err(|e| AppError::EventBus(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_prefixed_room_names() {
        assert_eq!(RedisEventBus::channel(&Room::Jobs), "room:jobs");
        assert_eq!(RedisEventBus::channel(&Room::Job(3)), "room:job_3");
        assert_eq!(RedisEventBus::channel(&Room::Monitor), "room:monitor");
    }
}
