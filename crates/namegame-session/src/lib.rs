//! Per-session client state for the name game.
//!
//! The client remembers which names it submitted during the current round
//! so a reload can still withdraw them. That memory is only valid for one
//! round: every entry carries the round's epoch, and a read under any
//! other epoch discards it.
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← restores its own submissions on startup
//!     ↕
//! Session Layer (this crate)  ← NameCache over a Storage backend
//!     ↕
//! Protocol Layer (below)  ← provides Identifier
//! ```

mod cache;
mod error;
mod storage;

pub use cache::{NAMES_KEY, NameCache, SubmittedName};
pub use error::SessionError;
pub use storage::{FileStorage, MemoryStorage, Storage};
