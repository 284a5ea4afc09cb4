// Cooperative shutdown for the background loops.

use tokio::sync::watch;

/// Receiver half handed to each long-lived loop.
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Non-blocking check, for loop heads.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested (or the sender is gone, which
    /// counts as shutdown).
    pub async fn wait(&mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Sender half, owned by the process entry point.
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tokens_observe_the_signal() {
        let (sender, token) = shutdown_channel();
        let mut cloned = token.clone();
        assert!(!token.is_shutdown());

        sender.shutdown();
        assert!(token.is_shutdown());
        cloned.wait().await;
    }

    #[tokio::test]
    async fn dropped_sender_releases_waiters() {
        let (sender, mut token) = shutdown_channel();
        drop(sender);
        token.wait().await;
        assert!(!token.is_shutdown());
    }
}
