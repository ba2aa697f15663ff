use std::sync::Arc;

use stripview::{Size, StripDelegate, StripOptions, StripView};

use crate::{
    CacheCategory, FULL_SIZE_CATEGORY, LoadQueue, PhotoDataSource, PhotoSource, PhotoView,
    PixelCost, THUMBNAIL_CATEGORY,
};

/// Pixel budget registered for thumbnails when the queue does not already have one.
pub const THUMBNAIL_PIXEL_BUDGET: u64 = 1024 * 1024;

/// A framework-neutral photo strip: a [`StripView`] fed by a shared [`LoadQueue`].
///
/// Adapters drive it by calling:
/// - `on_scroll` / `on_scroll_end` for scroll-primitive events
/// - `will_resize` / `did_resize` around geometry changes
/// - `tick(now_ms)` each frame, which advances animated moves and delivers loaded content to
///   the visible items
///
/// Use the offset returned by `tick()` to position the host's scroll container.
pub struct StripController<I, V> {
    view: StripView<I>,
    queue: Arc<LoadQueue<V>>,
    animate_moving_to_next_and_previous: bool,
}

impl<I, V> StripController<I, V>
where
    I: PhotoView<V> + 'static,
    V: PixelCost + Send + Sync + 'static,
{
    /// Builds the strip over `photos` and loads the initially visible items.
    ///
    /// Registers the thumbnail and full-size categories on `queue` unless they already exist.
    pub fn new(queue: Arc<LoadQueue<V>>, photos: Vec<PhotoSource>, options: StripOptions) -> Self {
        let thumbnail = CacheCategory::named(THUMBNAIL_CATEGORY);
        if queue.cache_stats(&thumbnail).is_none() {
            queue.register_category(thumbnail, THUMBNAIL_PIXEL_BUDGET);
        }
        let full_size = CacheCategory::named(FULL_SIZE_CATEGORY);
        if queue.cache_stats(&full_size).is_none() {
            let budget = queue.default_cache().budget;
            queue.register_category(full_size, budget);
        }

        let mut view = StripView::new(options);
        view.set_data_source(PhotoDataSource::<I, V>::new(Arc::clone(&queue), photos));
        view.reload_data();
        Self {
            view,
            queue,
            animate_moving_to_next_and_previous: false,
        }
    }

    pub fn view(&self) -> &StripView<I> {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut StripView<I> {
        &mut self.view
    }

    pub fn queue(&self) -> &Arc<LoadQueue<V>> {
        &self.queue
    }

    /// Installs a delegate and reloads so its `items_per_page` takes effect.
    pub fn set_delegate(&mut self, delegate: impl StripDelegate<I> + 'static) {
        self.view.set_delegate(delegate);
        self.view.reload_data();
    }

    /// Replaces the photo list. Visible items are recycled and rebound.
    pub fn set_photos(&mut self, photos: Vec<PhotoSource>) {
        vdebug!(count = photos.len(), "set_photos");
        // Recycle through the old source so its pending loads are cancelled.
        self.view.recycle_visible_items();
        self.view
            .set_data_source(PhotoDataSource::<I, V>::new(Arc::clone(&self.queue), photos));
        self.view.reload_data();
    }

    pub fn animate_moving_to_next_and_previous(&self) -> bool {
        self.animate_moving_to_next_and_previous
    }

    pub fn set_animate_moving_to_next_and_previous(&mut self, animate: bool) {
        self.animate_moving_to_next_and_previous = animate;
    }

    pub fn move_to_next(&mut self) {
        self.view
            .move_to_next(self.animate_moving_to_next_and_previous);
    }

    pub fn move_to_previous(&mut self) {
        self.view
            .move_to_previous(self.animate_moving_to_next_and_previous);
    }

    pub fn move_to_item(&mut self, index: usize, animated: bool) {
        self.view.move_to_item(index, animated);
    }

    pub fn on_scroll(&mut self, content_offset: f64) {
        self.view.on_scroll(content_offset);
    }

    pub fn on_scroll_end(&mut self) {
        self.view.on_scroll_end();
    }

    pub fn will_resize(&mut self) {
        self.view.will_resize();
    }

    pub fn did_resize(&mut self, viewport: Size) {
        self.view.did_resize(viewport);
    }

    /// Advances the controller.
    ///
    /// Steps an animated move (returning the new content offset, if one is running), then
    /// hands every finished load to its item if that item is still visible.
    pub fn tick(&mut self, now_ms: u64) -> Option<f64> {
        let offset = self.view.tick(now_ms);
        self.deliver_loaded();
        offset
    }

    /// Delivers finished loads without advancing animations. Returns how many reached a
    /// visible item.
    pub fn deliver_loaded(&mut self) -> usize {
        let mut delivered = 0;
        for completion in self.queue.poll() {
            let index = completion.photo_index;
            let Some(item) = self.view.item_mut(index) else {
                vtrace!(index, "loaded content for an item no longer visible");
                continue;
            };
            item.show_image(completion.image, &completion.category);
            self.view.notify_item_did_load(index);
            delivered += 1;
        }
        delivered
    }
}
