use crate::Rect;

/// Reuse key handed to the recycler when a data source does not pick one.
pub const DEFAULT_REUSE_KEY: &str = "item";

/// A reusable unit of visual state placed in the strip.
///
/// Only the index and reuse key are required; the remaining hooks default to no-ops so that
/// simple items do not have to care about them.
pub trait StripItem {
    fn item_index(&self) -> usize;

    fn set_item_index(&mut self, index: usize);

    /// Groups interchangeable instances inside the recycler pool.
    fn reuse_key(&self) -> &str {
        DEFAULT_REUSE_KEY
    }

    /// Called after the item has left the visible window, before it is pooled.
    ///
    /// Reset transient state here (zoom, selection, ...).
    fn on_disappear(&mut self) {}

    /// Called whenever the engine assigns a frame.
    ///
    /// `preserve_state` is `true` when the frame changes because the viewport was resized
    /// while the item stayed visible; items that track zoom or scroll position should keep it.
    fn set_frame(&mut self, frame: Rect, preserve_state: bool) {
        let _ = (frame, preserve_state);
    }
}

/// Supplies item count and item instances to a [`crate::StripView`].
pub trait StripDataSource<I> {
    /// Total number of items. Cached by the engine until the next `reload_data`.
    fn item_count(&mut self) -> usize;

    /// Produces the instance shown at `index`.
    ///
    /// `reusable` is an idle instance dequeued from the pool under
    /// [`StripDataSource::reuse_key`]; reconfigure and return it when present instead of
    /// building a new one.
    fn item_view(&mut self, index: usize, reusable: Option<I>) -> I;

    /// The reuse key the engine dequeues with before calling `item_view`.
    fn reuse_key(&self, index: usize) -> &str {
        let _ = index;
        DEFAULT_REUSE_KEY
    }

    /// The item at `index` left the visible window; stop any content loading for it.
    fn cancel_load(&mut self, index: usize) {
        let _ = index;
    }
}

/// Observes a [`crate::StripView`].
///
/// Only `items_per_page` is required.
pub trait StripDelegate<I> {
    /// Items shown per page. Cached by the engine until the next `reload_data`.
    fn items_per_page(&mut self) -> usize;

    /// The user scrolled (not fired for programmatic moves).
    fn did_scroll(&mut self) {}

    /// The current item index changed.
    fn did_change_items(&mut self, current_index: usize) {
        let _ = current_index;
    }

    /// The item is about to be shown; its frame has already been set.
    fn will_display(&mut self, item: &mut I) {
        let _ = item;
    }

    /// The item was removed from the strip and returned to the pool.
    fn did_recycle(&mut self, item: &mut I) {
        let _ = item;
    }

    /// Content for the item after the current one finished loading.
    fn did_load_next(&mut self) {}

    /// Content for the item before the current one finished loading.
    fn did_load_previous(&mut self) {}
}
