//! Shared helpers for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use fjall::Keyspace;

/// Unique scratch directory for one test run.
pub fn test_dir(name: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let pid = std::process::id();
    std::env::temp_dir()
        .join(".tmp")
        .join("tests")
        .join(format!("{name}-{pid}-{ts}"))
}

/// Best-effort cleanup of a test directory.
pub fn cleanup_dir(path: &Path) {
    let _ = std::fs::remove_dir_all(path);
}

/// Install a subscriber once so `RUST_LOG=fidplane=debug` surfaces crate
/// traces while debugging a failing test.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .try_init();
    });
}

/// Open (or reopen) a keyspace rooted at `path`.
pub fn open_keyspace(path: &Path) -> Arc<Keyspace> {
    let _ = std::fs::create_dir_all(path);
    Arc::new(fjall::Config::new(path).open().expect("open keyspace"))
}

/// Tiny deterministic xorshift generator so invariant sweeps are
/// reproducible without extra dependencies.
#[allow(dead_code)]
pub struct XorShift(u64);

#[allow(dead_code)]
impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}
