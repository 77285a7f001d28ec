// src/watch/mod.rs

//! File watching and change filtering.
//!
//! - [`event`] turns `notify` events into [`ChangeEvent`]s.
//! - [`filter`] decides which changes qualify as triggers.
//! - [`watcher`] owns the notify subscription and the loop feeding the
//!   callback.
//!
//! It does not know about jobs; the caller decides what a qualifying change
//! means.

pub mod event;
pub mod filter;
pub mod path_utils;
pub mod watcher;

pub use event::{ChangeEvent, ChangeKind};
pub use filter::{ChangeFilter, qualifies};
pub use watcher::{RawEvent, WatchHandle, WatchLoop, WatchState};
