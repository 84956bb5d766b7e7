//! Shared helpers for the TransactionalMap suite

use std::sync::Once;
use txmap::{MapConfig, TransactionalMap};

static INIT_TRACING: Once = Once::new();

/// Install a test subscriber once; output shows with `--nocapture`
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Map with a short lock backoff so blocked tests finish quickly
pub fn fast_map<V: Clone + Send + Sync>() -> TransactionalMap<V> {
    init_tracing();
    let config = MapConfig {
        lock_backoff_ms: 1,
        ..MapConfig::default()
    };
    TransactionalMap::with_config(config).unwrap()
}
