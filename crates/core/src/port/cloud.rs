// Cloud Provider Port (jury fleet provisioning)

use crate::error::Result;
use async_trait::async_trait;

/// The instance-provider contract the autoscaler consumes. Juries are
/// anonymous: the provider only knows the tag set, never which job an
/// instance holds.
#[async_trait]
pub trait Cloud: Send + Sync {
    /// Number of currently tagged jury instances.
    async fn current_count(&self) -> Result<u32>;

    /// Create one jury with the given name and bootstrap script. The script
    /// is the sole hand-off of credentials to the instance.
    async fn create_jury(&self, name: &str, user_data: &str) -> Result<()>;

    /// Destroy up to `n` arbitrary juries; returns how many actually went
    /// away (may be fewer than requested).
    async fn destroy_juries(&self, n: u32) -> Result<u32>;
}

pub mod mocks {
    use super::Cloud;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct CreatedJury {
        pub name: String,
        pub user_data: String,
    }

    /// In-memory provider tracking a fleet counter and creation requests.
    pub struct MockCloud {
        state: Mutex<MockCloudState>,
    }

    #[derive(Default)]
    struct MockCloudState {
        count: u32,
        created: Vec<CreatedJury>,
        destroyed: u32,
    }

    impl MockCloud {
        pub fn with_count(count: u32) -> Self {
            Self {
                state: Mutex::new(MockCloudState {
                    count,
                    ..Default::default()
                }),
            }
        }

        pub fn created(&self) -> Vec<CreatedJury> {
            self.state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .created
                .clone()
        }

        pub fn destroyed(&self) -> u32 {
            self.state.lock().unwrap_or_else(|e| e.into_inner()).destroyed
        }
    }

    #[async_trait]
    impl Cloud for MockCloud {
        async fn current_count(&self) -> Result<u32> {
            Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()).count)
        }

        async fn create_jury(&self, name: &str, user_data: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.count += 1;
            state.created.push(CreatedJury {
                name: name.to_string(),
                user_data: user_data.to_string(),
            });
            Ok(())
        }

        async fn destroy_juries(&self, n: u32) -> Result<u32> {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let destroyed = n.min(state.count);
            state.count -= destroyed;
            state.destroyed += destroyed;
            Ok(destroyed)
        }
    }
}
