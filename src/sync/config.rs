use std::time::Duration;

// For explanation, see issue: https://github.com/serde-rs/serde/issues/368
fn default_max_events_per_sync() -> usize {
    5000
}
fn default_max_sync_time_ms() -> u64 {
    60_000
}
fn default_keepalive_interval_ms() -> u64 {
    500
}
fn default_non_ancestor_filter_threshold_ms() -> u64 {
    3_000
}
fn default_max_inbound_syncs() -> usize {
    2
}
fn default_read_timeout_ms() -> u64 {
    5_000
}

/// Tuning of the sync protocol.
#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Upper bound on the events sent in one sync, 0 for no bound.
    #[serde(default = "default_max_events_per_sync")]
    pub max_events_per_sync: usize,
    #[serde(default = "default_max_sync_time_ms")]
    pub max_sync_time_ms: u64,
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,
    #[serde(default)]
    pub filter_likely_duplicates: bool,
    /// How long an event that is not an ancestor of our latest self event is held back.
    #[serde(default = "default_non_ancestor_filter_threshold_ms")]
    pub non_ancestor_filter_threshold_ms: u64,
    #[serde(default = "default_max_inbound_syncs")]
    pub max_inbound_syncs: usize,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_events_per_sync: default_max_events_per_sync(),
            max_sync_time_ms: default_max_sync_time_ms(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
            filter_likely_duplicates: false,
            non_ancestor_filter_threshold_ms: default_non_ancestor_filter_threshold_ms(),
            max_inbound_syncs: default_max_inbound_syncs(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl SyncConfig {
    pub fn max_sync_time(&self) -> Duration {
        Duration::from_millis(self.max_sync_time_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn non_ancestor_filter_threshold(&self) -> Duration {
        Duration::from_millis(self.non_ancestor_filter_threshold_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
