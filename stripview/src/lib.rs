//! A headless paging strip: a horizontally (or vertically) scrolling sequence of pages whose
//! items are created lazily and recycled as they leave the screen.
//!
//! For loading item content asynchronously and caching it per category, see the
//! `stripview-loader` crate.
//!
//! The strip is UI-agnostic. A host layer is expected to provide:
//! - viewport size (and the two resize phases around geometry changes)
//! - scroll offsets reported by its scroll primitive
//! - a clock for animated moves
//!
//! and to implement [`StripItem`] for its item views, [`StripDataSource`] to produce them and
//! optionally [`StripDelegate`] to observe the strip.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod geometry;
mod item;
mod options;
mod pool;
mod state;
mod strip;
mod tween;
mod types;


pub use geometry::{ItemAnchor, ResizePhase, anchored_offset, capture_anchor};
pub use item::{DEFAULT_REUSE_KEY, StripDataSource, StripDelegate, StripItem};
pub use options::{DEFAULT_ANIMATION_DURATION_MS, DEFAULT_HORIZONTAL_MARGIN, StripOptions};
pub use pool::RecyclerPool;
pub use state::ScrollState;
pub use strip::{ECHO_TOLERANCE, ItemSlot, StripView};
pub use types::{ItemRange, Orientation, Rect, Size};
