// Verdict Callback Port

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Outbound POST of a finished job's details to the submission's callback
/// URL. Implementations enforce the 2-second timeout; the engine fires at
/// most once per job and swallows failures.
#[async_trait]
pub trait CallbackPoster: Send + Sync {
    async fn post(&self, url: &str, payload: Value) -> Result<()>;
}

pub mod mocks {
    use super::CallbackPoster;
    use crate::error::{AppError, Result};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    /// Records callback posts; optionally fails every request to exercise
    /// the swallow-and-continue path.
    #[derive(Default)]
    pub struct RecordingCallbackPoster {
        pub fail: bool,
        posts: Mutex<Vec<(String, Value)>>,
    }

    impl RecordingCallbackPoster {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn posts(&self) -> Vec<(String, Value)> {
            self.posts.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    #[async_trait]
    impl CallbackPoster for RecordingCallbackPoster {
        async fn post(&self, url: &str, payload: Value) -> Result<()> {
            self.posts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((url.to_string(), payload));
            if self.fail {
                return Err(AppError::Callback("connection refused".to_string()));
            }
            Ok(())
        }
    }
}
