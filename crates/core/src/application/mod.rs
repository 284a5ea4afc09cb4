// Application Layer - services over the ports

pub mod autoscale;
pub mod dispatch;
pub mod lifecycle;
pub mod shutdown;

pub use autoscale::{Autoscaler, AutoscalerConfig, LoadIndex};
pub use dispatch::ClaimDispatcher;
pub use lifecycle::JobLifecycle;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
