use crate::*;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use stripview::{Size, StripDelegate, StripOptions};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, PartialEq)]
struct Img {
    source: String,
    pixels: u64,
}

impl PixelCost for Img {
    fn pixel_count(&self) -> u64 {
        self.pixels
    }
}

/// `"name:123"` costs 123 pixels; anything without a numeric suffix costs 1.
fn decode(source: &str) -> Result<Img, FetchError> {
    if source.starts_with("missing") {
        return Err(FetchError::NotFound(source.to_owned()));
    }
    let pixels = source
        .rsplit(':')
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    Ok(Img {
        source: source.to_owned(),
        pixels,
    })
}

fn instant_queue(options: QueueOptions) -> LoadQueue<Img> {
    LoadQueue::new(|source: &str| decode(source), options).unwrap()
}

/// A fetcher that reports each start and then blocks until released.
struct Gate {
    started: Receiver<String>,
    release: Sender<()>,
    calls: Arc<AtomicUsize>,
}

impl Gate {
    fn wait_started(&self) -> String {
        self.started.recv_timeout(WAIT).expect("fetch did not start")
    }

    fn release(&self, n: usize) {
        for _ in 0..n {
            self.release.send(()).unwrap();
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn gated_queue(options: QueueOptions) -> (LoadQueue<Img>, Gate) {
    let (started_tx, started_rx) = unbounded();
    let (release_tx, release_rx) = unbounded::<()>();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let queue = LoadQueue::new(
        move |source: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = started_tx.send(source.to_owned());
            let _ = release_rx.recv_timeout(WAIT);
            decode(source)
        },
        options,
    )
    .unwrap();
    (
        queue,
        Gate {
            started: started_rx,
            release: release_tx,
            calls,
        },
    )
}

/// Polls until nothing is queued or in flight.
fn drain(queue: &LoadQueue<Img>) -> Vec<Completion<Img>> {
    let deadline = Instant::now() + WAIT;
    let mut out = Vec::new();
    while Instant::now() < deadline {
        out.extend(queue.poll_timeout(Duration::from_millis(10)));
        if queue.pending_count() == 0 {
            out.extend(queue.poll());
            return out;
        }
    }
    panic!("queue did not go idle");
}

fn thumb() -> CacheCategory {
    CacheCategory::named("thumb")
}

#[test]
fn zero_concurrency_is_rejected() {
    let result = LoadQueue::new(
        |source: &str| decode(source),
        QueueOptions::default().with_max_concurrent(0),
    );
    assert!(matches!(result, Err(LoaderError::ZeroConcurrency)));
}

#[test]
fn duplicate_requests_share_one_fetch_and_cancel_suppresses_both() {
    let (queue, gate) = gated_queue(QueueOptions::default().with_category("thumb", 1000));

    let first = queue.request_load(3, "thumb", "photo-3:10", None);
    assert_eq!(first.status, LoadStatus::Enqueued);
    assert_eq!(gate.wait_started(), "photo-3:10");

    let second = queue.request_load(3, "thumb", "photo-3:10", None);
    assert_eq!(second.status, LoadStatus::Attached);
    assert_ne!(first.recipient, second.recipient);
    assert_eq!(queue.pending_count(), 1);
    assert_eq!(queue.request_state(3, &thumb()), Some(RequestState::InFlight));

    queue.cancel(3, "thumb");
    assert_eq!(queue.request_state(3, &thumb()), Some(RequestState::Cancelled));

    gate.release(1);
    assert!(drain(&queue).is_empty());
    assert_eq!(gate.calls(), 1);
    assert!(queue.image_at(3, &thumb()).is_none());
    assert_eq!(queue.request_state(3, &thumb()), None);
}

#[test]
fn duplicate_requests_each_receive_the_result() {
    let (queue, gate) = gated_queue(QueueOptions::default().with_category("thumb", 1000));

    let a = queue.request_load(3, "thumb", "photo-3:10", None);
    gate.wait_started();
    let b = queue.request_load(3, "thumb", "photo-3:10", None);
    gate.release(1);

    let done = drain(&queue);
    assert_eq!(gate.calls(), 1);
    assert_eq!(done.len(), 2);
    let mut recipients: Vec<RecipientId> = done.iter().map(|c| c.recipient).collect();
    recipients.sort();
    let mut expected = vec![a.recipient, b.recipient];
    expected.sort();
    assert_eq!(recipients, expected);
    assert!(Arc::ptr_eq(&done[0].image, &done[1].image));
    assert_eq!(done[0].photo_index, 3);
    assert_eq!(done[0].category, thumb());

    assert_eq!(queue.request_state(3, &thumb()), Some(RequestState::Completed));
    assert_eq!(queue.image_at(3, &thumb()).map(|i| i.pixels), Some(10));
}

#[test]
fn cancelling_a_queued_request_keeps_it_from_starting() {
    let (queue, gate) = gated_queue(QueueOptions::default().with_max_concurrent(1));

    queue.request_load(0, CacheCategory::Default, "a:1", None);
    assert_eq!(gate.wait_started(), "a:1");
    queue.request_load(1, CacheCategory::Default, "b:1", None);
    assert_eq!(
        queue.request_state(1, &CacheCategory::Default),
        Some(RequestState::Queued)
    );

    queue.cancel(1, CacheCategory::Default);
    assert_eq!(queue.request_state(1, &CacheCategory::Default), None);
    assert_eq!(queue.pending_count(), 1);

    gate.release(2);
    let done = drain(&queue);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].photo_index, 0);
    assert!(gate.started.recv_timeout(Duration::from_millis(50)).is_err());
    assert_eq!(gate.calls(), 1);
}

#[test]
fn higher_priorities_start_first_and_ties_are_fifo() {
    let (queue, gate) = gated_queue(QueueOptions::default().with_max_concurrent(1));

    queue.request_load(0, CacheCategory::Default, "blocker", None);
    gate.wait_started();
    queue.request_load(1, CacheCategory::Default, "low", Some(Priority::Low));
    queue.request_load(2, CacheCategory::Default, "high-a", Some(Priority::High));
    queue.request_load(3, CacheCategory::Default, "normal", None);
    queue.request_load(4, CacheCategory::Default, "high-b", Some(Priority::High));
    queue.request_load(5, CacheCategory::Default, "very-low", Some(Priority::VeryLow));

    gate.release(6);
    let order: Vec<String> = (0..5).map(|_| gate.wait_started()).collect();
    assert_eq!(order, ["high-a", "high-b", "normal", "low", "very-low"]);
    assert_eq!(drain(&queue).len(), 6);
}

#[test]
fn attaching_with_higher_priority_promotes_a_queued_request() {
    let (queue, gate) = gated_queue(QueueOptions::default().with_max_concurrent(1));

    queue.request_load(0, CacheCategory::Default, "blocker", None);
    gate.wait_started();
    queue.request_load(1, CacheCategory::Default, "first", None);
    queue.request_load(2, CacheCategory::Default, "second", Some(Priority::Low));
    let ticket = queue.request_load(2, CacheCategory::Default, "second", Some(Priority::VeryHigh));
    assert_eq!(ticket.status, LoadStatus::Attached);

    gate.release(3);
    assert_eq!(gate.wait_started(), "second");
    assert_eq!(gate.wait_started(), "first");
    assert_eq!(drain(&queue).len(), 4);
    assert_eq!(gate.calls(), 3);
}

#[test]
fn default_priority_comes_from_options() {
    let (queue, gate) = gated_queue(
        QueueOptions::default()
            .with_max_concurrent(1)
            .with_default_priority(Priority::VeryLow),
    );

    queue.request_load(0, CacheCategory::Default, "blocker", None);
    gate.wait_started();
    queue.request_load(1, CacheCategory::Default, "defaulted", None);
    queue.request_load(2, CacheCategory::Default, "low", Some(Priority::Low));

    gate.release(3);
    assert_eq!(gate.wait_started(), "low");
    assert_eq!(gate.wait_started(), "defaulted");
    drain(&queue);
}

#[test]
fn request_for_cancelled_in_flight_pair_revives_it() {
    let (queue, gate) = gated_queue(QueueOptions::default());

    queue.request_load(7, "thumb", "photo-7", None);
    gate.wait_started();
    queue.cancel(7, "thumb");
    let ticket = queue.request_load(7, "thumb", "photo-7", None);
    assert_eq!(ticket.status, LoadStatus::Attached);
    assert_eq!(queue.request_state(7, &thumb()), Some(RequestState::InFlight));

    gate.release(1);
    let done = drain(&queue);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].recipient, ticket.recipient);
    assert_eq!(gate.calls(), 1);
}

#[test]
fn fetch_failures_are_swallowed() {
    let queue = instant_queue(QueueOptions::default());

    queue.request_load(1, CacheCategory::Default, "missing-1", None);
    assert!(drain(&queue).is_empty());
    assert_eq!(queue.pending_count(), 0);
    assert_eq!(queue.request_state(1, &CacheCategory::Default), None);
    assert!(queue.image_at(1, &CacheCategory::Default).is_none());

    // No retry and no poisoning: a later request for the same pair fetches again.
    let ticket = queue.request_load(1, CacheCategory::Default, "found-1:5", None);
    assert_eq!(ticket.status, LoadStatus::Enqueued);
    assert_eq!(drain(&queue).len(), 1);
}

#[test]
fn cache_hits_are_delivered_on_the_next_poll() {
    let queue = instant_queue(QueueOptions::default());
    queue.request_load(2, CacheCategory::Default, "two:4", None);
    assert_eq!(drain(&queue).len(), 1);

    let ticket = queue.request_load(2, CacheCategory::Default, "two:4", None);
    assert_eq!(ticket.status, LoadStatus::Cached);
    let done = queue.poll();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].recipient, ticket.recipient);
    assert_eq!(done[0].image.source, "two:4");

    // Cancelling before the poll drops an undelivered hit.
    queue.request_load(2, CacheCategory::Default, "two:4", None);
    queue.cancel(2, CacheCategory::Default);
    assert!(queue.poll().is_empty());
    assert!(queue.image_at(2, &CacheCategory::Default).is_some());
}

#[test]
fn categories_evict_oldest_entries_to_stay_within_budget() {
    let queue = instant_queue(
        QueueOptions::default()
            .with_max_concurrent(1)
            .with_category("full", 100),
    );
    let full = CacheCategory::named("full");

    for index in 0..3 {
        queue.request_load(index, "full", &format!("photo-{index}:40"), None);
        assert_eq!(drain(&queue).len(), 1);
    }
    assert!(queue.image_at(0, &full).is_none());
    assert!(queue.image_at(1, &full).is_some());
    assert!(queue.image_at(2, &full).is_some());
    assert_eq!(
        queue.cache_stats(&full),
        Some(CacheStats {
            entries: 2,
            pixels: 80,
            budget: 100,
            evictions: 1,
        })
    );

    // Larger than the whole budget: delivered but never cached.
    queue.request_load(9, "full", "huge:500", None);
    let done = drain(&queue);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].image.pixels, 500);
    assert!(queue.image_at(9, &full).is_none());
    assert_eq!(queue.cache_stats(&full).map(|s| s.entries), Some(2));
}

#[test]
fn lookups_do_not_protect_entries_from_eviction() {
    let queue = instant_queue(
        QueueOptions::default()
            .with_max_concurrent(1)
            .with_category("full", 100),
    );
    let full = CacheCategory::named("full");

    for index in 0..2 {
        queue.request_load(index, "full", &format!("photo-{index}:40"), None);
        assert_eq!(drain(&queue).len(), 1);
    }
    // Reading and re-requesting index 0 must not make it the newest entry.
    assert!(queue.image_at(0, &full).is_some());
    let ticket = queue.request_load(0, "full", "photo-0:40", None);
    assert_eq!(ticket.status, LoadStatus::Cached);
    assert_eq!(queue.poll().len(), 1);

    queue.request_load(2, "full", "photo-2:40", None);
    assert_eq!(drain(&queue).len(), 1);
    assert!(queue.image_at(0, &full).is_none());
    assert!(queue.image_at(1, &full).is_some());
    assert!(queue.image_at(2, &full).is_some());
    assert_eq!(queue.cache_stats(&full).map(|s| s.pixels), Some(80));
}

#[test]
fn shrinking_a_budget_evicts_immediately() {
    let queue = instant_queue(QueueOptions::default().with_max_concurrent(1));
    for index in 0..4 {
        queue.request_load(index, CacheCategory::Default, "p:10", None);
        drain(&queue);
    }
    assert_eq!(queue.default_cache().entries, 4);

    queue.register_category(CacheCategory::Default, 25);
    let stats = queue.default_cache();
    assert_eq!((stats.entries, stats.pixels, stats.budget), (2, 20, 25));
    assert!(queue.image_at(1, &CacheCategory::Default).is_none());
    assert!(queue.image_at(3, &CacheCategory::Default).is_some());
}

#[test]
fn unregistered_categories_get_the_default_budget() {
    let queue = instant_queue(QueueOptions::default().with_default_pixel_budget(50));
    assert_eq!(queue.cache_stats(&CacheCategory::named("adhoc")), None);

    queue.request_load(0, "adhoc", "x:5", None);
    drain(&queue);
    let stats = queue.cache_stats(&CacheCategory::named("adhoc")).unwrap();
    assert_eq!((stats.entries, stats.budget), (1, 50));
}

#[test]
fn reset_and_unload_drop_cached_content() {
    let queue = LoadQueue::with_categories(
        |source: &str| decode(source),
        [("a", 100u64), ("b", 100u64)],
    )
    .unwrap();
    let a = CacheCategory::named("a");
    let b = CacheCategory::named("b");

    queue.request_load(0, "a", "x:1", None);
    queue.request_load(0, "b", "y:1", None);
    queue.request_load(1, CacheCategory::Default, "z:1", None);
    assert_eq!(drain(&queue).len(), 3);

    queue.reset_category(&a);
    assert!(queue.image_at(0, &a).is_none());
    assert!(queue.image_at(0, &b).is_some());
    assert_eq!(queue.cache_stats(&a).map(|s| s.budget), Some(100));

    queue.unload_caches();
    assert!(queue.image_at(0, &b).is_none());
    assert_eq!(queue.default_cache().entries, 0);
    assert_eq!(queue.default_cache().budget, DEFAULT_PIXEL_BUDGET);
}

#[test]
fn dispatch_hands_completions_to_the_observer() {
    let queue = instant_queue(QueueOptions::default());
    queue.request_load(4, "thumb", "four", None);
    queue.request_load(5, "thumb", "five", None);
    drain(&queue);
    queue.request_load(4, "thumb", "four", None);
    queue.request_load(5, "thumb", "five", None);

    let mut seen = Vec::new();
    let mut observer = |image: &Arc<Img>, index: usize, category: &CacheCategory| {
        seen.push((index, category.to_string(), image.source.clone()));
    };
    assert_eq!(queue.dispatch(&mut observer), 2);
    seen.sort();
    assert_eq!(
        seen,
        vec![
            (4, "thumb".to_owned(), "four".to_owned()),
            (5, "thumb".to_owned(), "five".to_owned()),
        ]
    );
}

#[test]
fn shutdown_joins_idle_workers() {
    let queue = instant_queue(QueueOptions::default().with_max_concurrent(3));
    queue.request_load(0, CacheCategory::Default, "x", None);
    drain(&queue);
    queue.shutdown();
}

#[test]
fn fetch_errors_format_their_cause() {
    assert_eq!(
        FetchError::NotFound("a.jpg".into()).to_string(),
        "source not found: a.jpg"
    );
    assert_eq!(
        LoaderError::ZeroConcurrency.to_string(),
        "max_concurrent must be at least 1"
    );
}

// Controller

type Controller = StripController<PhotoItem<Img>, Img>;

fn photos(n: usize) -> Vec<PhotoSource> {
    (0..n)
        .map(|i| {
            PhotoSource::new(format!("full-{i}:9"))
                .with_thumbnail(format!("thumb-{i}:1"))
                .with_caption(format!("Photo {i}"))
        })
        .collect()
}

fn options() -> StripOptions {
    StripOptions::new(Size::new(300.0, 200.0))
}

fn wait_for(controller: &mut Controller, mut done: impl FnMut(&Controller) -> bool) {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        controller.deliver_loaded();
        if done(controller) {
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("condition not reached");
}

#[test]
fn controller_shows_full_size_content_for_the_visible_item() {
    let queue = Arc::new(instant_queue(QueueOptions::default()));
    let mut controller = Controller::new(Arc::clone(&queue), photos(10), options());

    assert_eq!(controller.view().number_of_items(), Some(10));
    assert!(
        queue
            .cache_stats(&CacheCategory::named(THUMBNAIL_CATEGORY))
            .is_some()
    );
    wait_for(&mut controller, |c| {
        c.view().item(0).is_some_and(|item| item.is_full_size())
    });

    let item = controller.view().item(0).unwrap();
    assert_eq!(item.caption(), Some("Photo 0"));
    assert_eq!(item.image().map(|i| i.source.as_str()), Some("full-0:9"));
}

#[test]
fn cached_content_is_shown_when_an_item_is_bound() {
    let queue = Arc::new(instant_queue(QueueOptions::default()));
    let mut controller = Controller::new(Arc::clone(&queue), photos(10), options());
    wait_for(&mut controller, |c| {
        c.view().item(0).is_some_and(|item| item.is_full_size())
    });

    controller.on_scroll(320.0);
    controller.on_scroll(0.0);
    // Recycling cleared the item; rebinding found index 0 in the cache.
    let item = controller.view().item(0).unwrap();
    assert!(item.is_full_size());
}

#[test]
fn recycling_cancels_loads_for_items_that_left() {
    let (queue, gate) = gated_queue(QueueOptions::default().with_max_concurrent(1));
    let queue = Arc::new(queue);
    let mut controller = Controller::new(Arc::clone(&queue), photos(10), options());
    let thumbs = CacheCategory::named(THUMBNAIL_CATEGORY);
    let full = CacheCategory::named(FULL_SIZE_CATEGORY);

    // Thumbnails are requested at high priority, so they start first.
    assert_eq!(gate.wait_started(), "thumb-0:1");
    assert_eq!(queue.request_state(0, &full), Some(RequestState::Queued));

    controller.on_scroll(5.0 * 320.0);
    assert_eq!(queue.request_state(0, &thumbs), Some(RequestState::Cancelled));
    assert_eq!(queue.request_state(0, &full), None);

    gate.release(3);
    wait_for(&mut controller, |c| {
        c.view().item(5).is_some_and(|item| item.is_full_size())
    });
    assert!(queue.image_at(0, &thumbs).is_none());
    assert_eq!(gate.calls(), 3);
}

#[derive(Clone, Debug, PartialEq)]
enum Loaded {
    Next,
    Previous,
}

struct PairDelegate {
    events: Rc<RefCell<Vec<Loaded>>>,
}

impl StripDelegate<PhotoItem<Img>> for PairDelegate {
    fn items_per_page(&mut self) -> usize {
        2
    }

    fn did_load_next(&mut self) {
        self.events.borrow_mut().push(Loaded::Next);
    }

    fn did_load_previous(&mut self) {
        self.events.borrow_mut().push(Loaded::Previous);
    }
}

#[test]
fn content_for_the_next_item_notifies_the_delegate() {
    let queue = Arc::new(instant_queue(QueueOptions::default()));
    let mut controller = Controller::new(Arc::clone(&queue), photos(10), options());
    let events = Rc::new(RefCell::new(Vec::new()));
    controller.set_delegate(PairDelegate {
        events: Rc::clone(&events),
    });
    assert_eq!(controller.view().items_per_page(), 2);

    wait_for(&mut controller, |c| {
        c.view().item(1).is_some_and(|item| item.is_full_size())
    });
    assert!(events.borrow().contains(&Loaded::Next));
    assert!(!events.borrow().contains(&Loaded::Previous));
}

#[test]
fn next_and_previous_respect_the_animation_flag() {
    let queue = Arc::new(instant_queue(QueueOptions::default()));
    let mut controller = Controller::new(queue, photos(10), options());
    assert!(!controller.animate_moving_to_next_and_previous());

    controller.move_to_next();
    assert_eq!(controller.view().current_item_index(), 1);
    assert!(!controller.view().is_animating());

    controller.set_animate_moving_to_next_and_previous(true);
    controller.move_to_next();
    assert!(controller.view().is_animating());
    assert_eq!(controller.tick(0), Some(320.0));
    assert_eq!(controller.tick(1_000), Some(640.0));
    assert_eq!(controller.view().current_item_index(), 2);

    controller.move_to_previous();
    controller.tick(2_000);
    controller.tick(3_000);
    assert_eq!(controller.view().current_item_index(), 1);
}

#[test]
fn set_photos_rebinds_visible_items() {
    let queue = Arc::new(instant_queue(QueueOptions::default()));
    let mut controller = Controller::new(Arc::clone(&queue), photos(10), options());
    controller.move_to_item(8, false);

    let replacement = vec![
        PhotoSource::new("other-0").with_caption("first"),
        PhotoSource::new("other-1").with_caption("second"),
    ];
    controller.set_photos(replacement);
    assert_eq!(controller.view().number_of_items(), Some(2));
    assert_eq!(controller.view().current_item_index(), 1);
    assert_eq!(
        controller.view().item(1).and_then(|i| i.caption()),
        Some("second")
    );

    controller.move_to_item(0, false);
    assert_eq!(
        controller.view().item(0).and_then(|i| i.caption()),
        Some("first")
    );
}

#[test]
fn resize_keeps_the_current_photo() {
    let queue = Arc::new(instant_queue(QueueOptions::default()));
    let mut controller = Controller::new(queue, photos(10), options());
    controller.move_to_item(4, false);

    controller.will_resize();
    controller.did_resize(Size::new(500.0, 300.0));
    assert_eq!(controller.view().current_item_index(), 4);
    assert_eq!(controller.view().content_offset(), 4.0 * 520.0);
    controller.on_scroll_end();
    assert_eq!(controller.view().current_item_index(), 4);
}
