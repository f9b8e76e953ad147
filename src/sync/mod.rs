mod bridge;

pub use bridge::{MountedView, SyncBridge, SyncConfig, ViewSnapshot, DEFAULT_POLL_INTERVAL};
