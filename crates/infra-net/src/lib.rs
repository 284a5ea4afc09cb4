// Judge Infrastructure - Network Adapters
// Implements: EventBus (redis), Cloud (DigitalOcean), CallbackPoster (HTTP)

mod callback;
mod cloud;
mod fanout;

pub use callback::HttpCallbackPoster;
pub use cloud::DigitalOceanCloud;
pub use fanout::RedisEventBus;
