// Example: a 20-page strip driven by simulated scroll, animation and rotation events.
use stripview::{Size, StripDataSource, StripDelegate, StripItem, StripOptions, StripView};

#[derive(Debug)]
struct Page {
    index: usize,
    serial: usize,
}

impl StripItem for Page {
    fn item_index(&self) -> usize {
        self.index
    }

    fn set_item_index(&mut self, index: usize) {
        self.index = index;
    }
}

struct Pages {
    count: usize,
    built: usize,
}

impl StripDataSource<Page> for Pages {
    fn item_count(&mut self) -> usize {
        self.count
    }

    fn item_view(&mut self, index: usize, reusable: Option<Page>) -> Page {
        reusable.unwrap_or_else(|| {
            self.built += 1;
            Page {
                index,
                serial: self.built,
            }
        })
    }
}

struct Printer;

impl StripDelegate<Page> for Printer {
    fn items_per_page(&mut self) -> usize {
        1
    }

    fn did_change_items(&mut self, current_index: usize) {
        println!("  current item -> {current_index}");
    }

    fn did_recycle(&mut self, item: &mut Page) {
        println!("  recycled page #{} (was index {})", item.serial, item.index);
    }
}

fn main() {
    let mut strip = StripView::new(StripOptions::new(Size::new(320.0, 480.0)));
    strip.set_data_source(Pages {
        count: 20,
        built: 0,
    });
    strip.set_delegate(Printer);
    strip.reload_data();

    println!("user drags to 500pt");
    strip.on_scroll(500.0);
    println!("visible={:?}", strip.visible_range());
    strip.on_scroll_end();
    println!("settled at offset={}", strip.content_offset());

    println!("animated move to item 7");
    strip.move_to_item(7, true);
    let mut now_ms = 0;
    while let Some(offset) = strip.tick(now_ms) {
        if !strip.is_animating() {
            println!("  arrived at offset={offset}");
        }
        now_ms += 16;
    }

    println!("rotate to landscape");
    strip.resize(Size::new(480.0, 320.0));
    println!(
        "current={} offset={} pooled={}",
        strip.current_item_index(),
        strip.content_offset(),
        strip.pool().len()
    );
}
