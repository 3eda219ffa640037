use crate::engine::EngineConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber controlled by `RUST_LOG` env var.
/// Safe to call multiple times — only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config with the given threshold, rooted at `path`.
pub fn config(path: &Path, memtable_threshold: usize) -> EngineConfig {
    init_tracing();
    EngineConfig {
        memtable_threshold,
        directory: path.to_path_buf(),
    }
}

/// Threshold large enough that nothing is flushed during the test.
pub fn memtable_only_config(path: &Path) -> EngineConfig {
    config(path, 64 * 1024)
}

/// Tiny threshold that rotates the memtable on almost every write.
pub fn small_buffer_config(path: &Path) -> EngineConfig {
    config(path, 10)
}

/// Ids of the `sstable-<id>.sst` files currently in `path`, sorted.
pub fn sst_ids_on_disk(path: &Path) -> Vec<u64> {
    let mut ids: Vec<u64> = std::fs::read_dir(path)
        .expect("read_dir")
        .filter_map(|entry| {
            let name = entry.expect("dir entry").file_name();
            let name = name.to_string_lossy().into_owned();
            name.strip_prefix("sstable-")?
                .strip_suffix(".sst")?
                .parse()
                .ok()
        })
        .collect();
    ids.sort_unstable();
    ids
}
