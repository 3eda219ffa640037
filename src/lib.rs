//! # StrataDB
//!
//! An embeddable, persistent key-value storage engine built on a
//! **Log-Structured Merge Tree (LSM-tree)** architecture. Designed for
//! fast writes and consistent, snapshot-isolated reads.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        Engine                           │
//! │                                                         │
//! │   snapshot (copy-on-write StoreState)                   │
//! │  ┌────────────┐   ┌──────────────┐   ┌─────────────┐    │
//! │  │   Active   │   │    Frozen    │   │  SSTables   │    │
//! │  │  Memtable  │──►│  Memtables   │──►│  (on disk)  │    │
//! │  │            │   │ (flush queue)│   │  by id      │    │
//! │  └────────────┘   └──────┬───────┘   └─────────────┘    │
//! │     rotate on            │ bounded channel              │
//! │     threshold            ▼                              │
//! │                   ┌──────────────┐                      │
//! │                   │ Flush worker │  one thread          │
//! │                   └──────────────┘                      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | Core storage engine — open, get, put, remove, close |
//! | [`memtable`] | In-memory sorted write buffer with a frozen read-only flavor |
//! | [`sstable`] | Immutable, sorted, on-disk tables with sparse-indexed point lookups |
//! | [`encoding`] | Little-endian fixed-width wire format for on-disk structures |
//!
//! ## Key Features
//!
//! - **Snapshot-isolated reads** — every read operates on one immutable
//!   point-in-time state; writers publish new states, never mutate old
//!   ones.
//! - **Background flushing** — a dedicated worker persists frozen
//!   memtables through a bounded handoff channel that applies
//!   backpressure when flushing lags.
//! - **Sparse-indexed lookups** — each SSTable samples roughly one key
//!   per 4 KiB of payload, bounding a point lookup to a single narrow
//!   block read.
//! - **Atomic table files** — SSTables are materialized via
//!   write-to-temp, fsync, and rename; a crash never leaves a partial
//!   table behind.
//! - **Tombstone deletes** — removals write zero-length values that
//!   shadow older versions in every layer and persist across restarts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stratadb::{Engine, EngineConfig};
//!
//! let config = EngineConfig {
//!     memtable_threshold: 4096,
//!     directory: "/tmp/my_db".into(),
//! };
//!
//! let engine = Engine::open(config).unwrap();
//!
//! // Write
//! engine.put(b"hello", b"world").unwrap();
//!
//! // Read
//! assert_eq!(engine.get(b"hello").unwrap(), Some(b"world".to_vec()));
//!
//! // Delete
//! engine.remove(b"hello").unwrap();
//! assert_eq!(engine.get(b"hello").unwrap(), None);
//!
//! // Graceful shutdown (also runs on drop)
//! engine.close().unwrap();
//! ```

pub mod encoding;
pub mod engine;
pub mod memtable;
pub mod sstable;

pub use engine::{Engine, EngineConfig, EngineError};
