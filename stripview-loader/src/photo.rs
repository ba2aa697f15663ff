use std::marker::PhantomData;
use std::sync::Arc;

use stripview::{Rect, StripDataSource, StripItem};

use crate::{CacheCategory, LoadQueue, PixelCost, Priority};

/// Category holding small previews shown while the full-size image loads.
pub const THUMBNAIL_CATEGORY: &str = "thumbnail";

/// Category holding full-size images.
pub const FULL_SIZE_CATEGORY: &str = "full_size";

/// Where one photo's content comes from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhotoSource {
    pub full_size: String,
    pub thumbnail: Option<String>,
    pub caption: Option<String>,
}

impl PhotoSource {
    pub fn new(full_size: impl Into<String>) -> Self {
        Self {
            full_size: full_size.into(),
            ..Self::default()
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// An item that displays loaded photo content.
pub trait PhotoView<V>: StripItem {
    fn create(index: usize) -> Self;

    /// Called each time the item is (re)bound to a photo, before any content arrives.
    fn configure(&mut self, photo: &PhotoSource) {
        let _ = photo;
    }

    /// Content for the bound photo arrived, from the cache or a finished fetch.
    fn show_image(&mut self, image: Arc<V>, category: &CacheCategory);
}

/// A ready-made [`PhotoView`]: a thumbnail, replaced by the full-size image once it loads.
#[derive(Debug)]
pub struct PhotoItem<V> {
    index: usize,
    caption: Option<String>,
    image: Option<Arc<V>>,
    is_full_size: bool,
    frame: Rect,
    zoom_scale: f64,
}

impl<V> PhotoItem<V> {
    pub fn image(&self) -> Option<&Arc<V>> {
        self.image.as_ref()
    }

    pub fn is_full_size(&self) -> bool {
        self.is_full_size
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn zoom_scale(&self) -> f64 {
        self.zoom_scale
    }

    pub fn set_zoom_scale(&mut self, scale: f64) {
        self.zoom_scale = scale.max(1.0);
    }
}

impl<V> StripItem for PhotoItem<V> {
    fn item_index(&self) -> usize {
        self.index
    }

    fn set_item_index(&mut self, index: usize) {
        self.index = index;
    }

    fn on_disappear(&mut self) {
        self.image = None;
        self.is_full_size = false;
        self.zoom_scale = 1.0;
    }

    fn set_frame(&mut self, frame: Rect, preserve_state: bool) {
        self.frame = frame;
        if !preserve_state {
            self.zoom_scale = 1.0;
        }
    }
}

impl<V> PhotoView<V> for PhotoItem<V> {
    fn create(index: usize) -> Self {
        Self {
            index,
            caption: None,
            image: None,
            is_full_size: false,
            frame: Rect::default(),
            zoom_scale: 1.0,
        }
    }

    fn configure(&mut self, photo: &PhotoSource) {
        self.caption.clone_from(&photo.caption);
    }

    fn show_image(&mut self, image: Arc<V>, category: &CacheCategory) {
        if *category == CacheCategory::named(FULL_SIZE_CATEGORY) {
            self.image = Some(image);
            self.is_full_size = true;
        } else if !self.is_full_size {
            // A late thumbnail never replaces the full-size image.
            self.image = Some(image);
        }
    }
}

/// Binds photo sources to strip items and drives their loading through a shared queue.
///
/// Cached content is shown as soon as an item is bound. Missing content is requested: the
/// thumbnail at high priority, the full-size image at the queue's default priority. Both
/// requests are cancelled when the item is recycled.
pub struct PhotoDataSource<I, V> {
    queue: Arc<LoadQueue<V>>,
    photos: Vec<PhotoSource>,
    thumbnail: CacheCategory,
    full_size: CacheCategory,
    _item: PhantomData<fn() -> I>,
}

impl<I, V> PhotoDataSource<I, V> {
    pub fn new(queue: Arc<LoadQueue<V>>, photos: Vec<PhotoSource>) -> Self {
        Self {
            queue,
            photos,
            thumbnail: CacheCategory::named(THUMBNAIL_CATEGORY),
            full_size: CacheCategory::named(FULL_SIZE_CATEGORY),
            _item: PhantomData,
        }
    }

    pub fn photos(&self) -> &[PhotoSource] {
        &self.photos
    }
}

impl<I, V> StripDataSource<I> for PhotoDataSource<I, V>
where
    I: PhotoView<V>,
    V: PixelCost + Send + Sync + 'static,
{
    fn item_count(&mut self) -> usize {
        self.photos.len()
    }

    fn item_view(&mut self, index: usize, reusable: Option<I>) -> I {
        let mut item = reusable.unwrap_or_else(|| I::create(index));
        item.set_item_index(index);
        let Some(photo) = self.photos.get(index) else {
            return item;
        };
        item.configure(photo);

        if let Some(image) = self.queue.image_at(index, &self.full_size) {
            item.show_image(image, &self.full_size);
            return item;
        }
        match self.queue.image_at(index, &self.thumbnail) {
            Some(image) => item.show_image(image, &self.thumbnail),
            None => {
                if let Some(thumbnail) = &photo.thumbnail {
                    self.queue.request_load(
                        index,
                        self.thumbnail.clone(),
                        thumbnail,
                        Some(Priority::High),
                    );
                }
            }
        }
        self.queue
            .request_load(index, self.full_size.clone(), &photo.full_size, None);
        item
    }

    fn cancel_load(&mut self, index: usize) {
        self.queue.cancel(index, self.thumbnail.clone());
        self.queue.cancel(index, self.full_size.clone());
    }
}
