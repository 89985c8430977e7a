//! mediasift - semantic search over local photo and video libraries
//!
//! Media files under a directory are decoded to RGB, embedded with a CLIP
//! model and kept in a single checkpointed snapshot. Text queries are embedded
//! into the same space and ranked against every stored vector. Re-running an
//! index only embeds files the snapshot does not know yet, and an interrupted
//! run resumes from its last checkpoint.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod media;
pub mod search;
pub mod storage;

pub use engine::{Engine, IndexStatus, UpdateHandle};
pub use error::{MediaSiftError, Result};
pub use indexer::{NoProgress, ProgressObserver, StopFlag, UpdateOutcome, UpdateStats};
pub use search::{Page, SearchHit};
