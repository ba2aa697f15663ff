use std::sync::Arc;
use std::thread;
use std::time::Duration;

use stripview::{Size, StripOptions};
use stripview_loader::{
    CacheCategory, FetchError, LoadQueue, PhotoItem, PhotoSource, PixelCost, QueueOptions,
    StripController, THUMBNAIL_CATEGORY,
};

// Example: a photo strip whose content is "downloaded" by a slow fake fetcher.
//
// A host would:
// - forward scroll and resize events to the controller
// - call tick(now_ms) from its frame loop and apply the returned offset
// - render each visible item's current image
struct Bitmap {
    width: u32,
    height: u32,
}

impl PixelCost for Bitmap {
    fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

fn fetch(source: &str) -> Result<Bitmap, FetchError> {
    thread::sleep(Duration::from_millis(20));
    if source.starts_with("thumb") {
        Ok(Bitmap {
            width: 64,
            height: 48,
        })
    } else {
        Ok(Bitmap {
            width: 1024,
            height: 768,
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let queue = Arc::new(LoadQueue::new(
        fetch,
        QueueOptions::default().with_max_concurrent(2),
    )?);
    let photos = (0..30)
        .map(|i| {
            PhotoSource::new(format!("https://example.invalid/full/{i}.jpg"))
                .with_thumbnail(format!("thumb/{i}.jpg"))
                .with_caption(format!("Photo #{i}"))
        })
        .collect();

    let mut strip: StripController<PhotoItem<Bitmap>, Bitmap> =
        StripController::new(Arc::clone(&queue), photos, StripOptions::new(Size::new(320.0, 480.0)));
    strip.set_animate_moving_to_next_and_previous(true);

    let mut now_ms = 0;
    for step in 0..40 {
        if step == 10 {
            println!("-> next");
            strip.move_to_next();
        }
        if step == 25 {
            println!("-> rotate");
            strip.will_resize();
            strip.did_resize(Size::new(480.0, 320.0));
        }
        if let Some(offset) = strip.tick(now_ms) {
            println!("offset={offset:.1}");
        }
        for slot in strip.view().visible_items() {
            let item = slot.instance();
            if let Some(image) = item.image() {
                println!(
                    "  [{}] {:?} {}x{}{}",
                    slot.index(),
                    item.caption(),
                    image.width,
                    image.height,
                    if item.is_full_size() { " (full)" } else { "" }
                );
            }
        }
        thread::sleep(Duration::from_millis(16));
        now_ms += 16;
    }

    println!(
        "thumbnails={:?} pending={}",
        queue.cache_stats(&CacheCategory::named(THUMBNAIL_CATEGORY)),
        queue.pending_count()
    );
    Ok(())
}
