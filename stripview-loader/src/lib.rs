//! Content loading for `stripview`.
//!
//! The `stripview` crate decides which item indices are visible; this crate fetches their
//! content off the UI thread and keeps it in pixel-budgeted caches:
//!
//! - [`LoadQueue`]: a bounded worker pool that deduplicates requests per
//!   `(photo_index, category)`, honours priorities and cancellation, and hands results back
//!   on the polling thread
//! - [`PhotoDataSource`] / [`PhotoItem`]: a data source and item type that request thumbnail
//!   and full-size content as items are bound and cancel it as they are recycled
//! - [`StripController`]: a `StripView` wired to a shared `LoadQueue`
//!
//! This crate is framework-agnostic: fetching is supplied through [`Fetch`], and the host
//! calls `tick`/`poll` from its own event loop.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod cache;
mod controller;
mod error;
mod fetch;
mod photo;
mod queue;

#[cfg(test)]
mod tests;

pub use cache::{CacheCategory, CacheStats};
pub use controller::{StripController, THUMBNAIL_PIXEL_BUDGET};
pub use error::{FetchError, LoaderError};
pub use fetch::{Fetch, PixelCost};
pub use photo::{
    FULL_SIZE_CATEGORY, PhotoDataSource, PhotoItem, PhotoSource, PhotoView, THUMBNAIL_CATEGORY,
};
pub use queue::{
    Completion, DEFAULT_MAX_CONCURRENT, DEFAULT_PIXEL_BUDGET, LoadObserver, LoadQueue,
    LoadStatus, LoadTicket, Priority, QueueOptions, RecipientId, RequestState,
};
