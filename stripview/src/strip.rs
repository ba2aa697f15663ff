use std::fmt;
use std::mem;

use crate::geometry::{GeometryPreserver, INDEX_EPSILON, index_at};
use crate::tween::Tween;
use crate::{
    ItemAnchor, ItemRange, Orientation, RecyclerPool, Rect, ResizePhase, ScrollState, Size,
    StripDataSource, StripDelegate, StripItem, StripOptions, anchored_offset, capture_anchor,
};

/// Largest difference between a reported and the current content offset still treated as
/// the same offset by [`StripView::on_scroll`].
pub const ECHO_TOLERANCE: f64 = 0.5;

/// The live binding between a visible index and its item instance.
#[derive(Debug)]
pub struct ItemSlot<I> {
    index: usize,
    frame: Rect,
    instance: I,
}

impl<I> ItemSlot<I> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn instance(&self) -> &I {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut I {
        &mut self.instance
    }
}

/// Geometry shared by every frame computation of one layout pass.
#[derive(Clone, Copy, Debug)]
struct Layout {
    orientation: Orientation,
    span: f64,
    margin: f64,
    cross: f64,
}

impl Layout {
    fn frame(&self, index: usize) -> Rect {
        let origin = index as f64 * self.span + self.margin;
        let size = (self.span - 2.0 * self.margin).max(0.0);
        Rect::from_axes(self.orientation, origin, size, self.cross)
    }
}

/// A headless paging strip.
///
/// The strip owns the scroll position and the set of live item slots. It does not draw
/// anything and does not translate gestures: the host feeds it scroll offsets
/// (`on_scroll`/`on_scroll_end`), viewport changes (`will_resize`/`did_resize`) and time
/// (`tick`), and applies `content_offset()` back to its own scroll primitive.
///
/// Items are requested lazily from the [`StripDataSource`] as indices enter the visible
/// window and are returned to the [`RecyclerPool`] as they leave it, so the number of live
/// instances is bounded by the window size regardless of the item count.
///
/// All methods run on one thread; nothing here is `Sync`-sensitive.
pub struct StripView<I> {
    options: StripOptions,
    data_source: Option<Box<dyn StripDataSource<I>>>,
    delegate: Option<Box<dyn StripDelegate<I>>>,

    viewport: Size,
    content_offset: f64,
    number_of_items: Option<usize>,
    items_per_page: usize,

    slots: Vec<ItemSlot<I>>, // sorted by index
    pool: RecyclerPool<I>,

    last_item_index: usize,
    fractional_position: f64,
    is_user_driven: bool,
    is_programmatic_move: bool,
    is_modifying_content_offset: bool,
    animation: Option<Tween>,
    geometry: GeometryPreserver,
}

impl<I: StripItem> StripView<I> {
    pub fn new(options: StripOptions) -> Self {
        vdebug!(
            margin = options.horizontal_margin,
            width = options.initial_viewport.width,
            height = options.initial_viewport.height,
            "StripView::new"
        );
        Self {
            viewport: options.initial_viewport,
            options,
            data_source: None,
            delegate: None,
            content_offset: 0.0,
            number_of_items: None,
            items_per_page: 1,
            slots: Vec::new(),
            pool: RecyclerPool::new(),
            last_item_index: 0,
            fractional_position: 0.0,
            is_user_driven: false,
            is_programmatic_move: false,
            is_modifying_content_offset: false,
            animation: None,
            geometry: GeometryPreserver::default(),
        }
    }

    pub fn options(&self) -> &StripOptions {
        &self.options
    }

    /// Installs the data source. Call `reload_data` afterwards to pick up its items.
    pub fn set_data_source(&mut self, data_source: impl StripDataSource<I> + 'static) {
        self.data_source = Some(Box::new(data_source));
    }

    pub fn set_delegate(&mut self, delegate: impl StripDelegate<I> + 'static) {
        self.delegate = Some(Box::new(delegate));
    }

    pub fn clear_delegate(&mut self) {
        self.delegate = None;
    }

    /// Re-queries the data source and delegate, clamps the current index into the new item
    /// count and repopulates the visible window.
    ///
    /// Slots whose index is still valid are kept as they are.
    pub fn reload_data(&mut self) {
        let count = self.data_source.as_mut().map_or(0, |ds| ds.item_count());
        let per_page = self
            .delegate
            .as_mut()
            .map_or(1, |d| d.items_per_page())
            .max(1);
        let per_page_changed = per_page != self.items_per_page;
        let previous_index = self.last_item_index;
        self.number_of_items = Some(count);
        self.items_per_page = per_page;
        vdebug!(count, per_page, "reload_data");

        if let Some(tween) = self.animation {
            if tween.target_index >= count {
                self.animation = None;
                self.is_programmatic_move = false;
            } else if per_page_changed {
                // The tween's offsets belong to the old item span; land on its target instead.
                self.animation = None;
                self.is_programmatic_move = false;
                self.last_item_index = tween.target_index;
            }
        }

        if count == 0 {
            self.last_item_index = 0;
            self.apply_content_offset(0.0, per_page_changed);
            self.update_fraction();
            return;
        }

        let clamped = self.last_item_index >= count;
        if clamped {
            vdebug!(
                from = self.last_item_index,
                to = count - 1,
                "reload_data: clamping current item"
            );
            self.last_item_index = count - 1;
        }

        // A new items-per-page changes the item span, so the old offset names another item.
        let max = self.max_content_offset();
        let offset = if clamped || per_page_changed || self.content_offset > max {
            self.offset_for_item(self.last_item_index)
        } else {
            self.content_offset
        };
        self.apply_content_offset(offset, per_page_changed);
        self.update_fraction();

        if clamped || self.last_item_index != previous_index {
            self.notify_did_change_items();
        }
    }

    /// Returns every live slot to the pool, so the next layout rebinds all visible indices.
    ///
    /// Use before `reload_data` when the content behind existing indices changed.
    pub fn recycle_visible_items(&mut self) {
        for slot in mem::take(&mut self.slots) {
            self.recycle(slot);
        }
    }

    /// The cached item count; `None` until `reload_data` has run once.
    pub fn number_of_items(&self) -> Option<usize> {
        self.number_of_items
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn content_offset(&self) -> f64 {
        self.content_offset
    }

    /// The item the strip considers current.
    pub fn current_item_index(&self) -> usize {
        self.last_item_index
    }

    /// Width of one page along the axis of travel: the viewport plus a margin on each side.
    pub fn page_span(&self) -> f64 {
        self.viewport.main(self.options.orientation) + 2.0 * self.options.horizontal_margin
    }

    /// Width of one item slot along the axis of travel.
    pub fn item_span(&self) -> f64 {
        self.page_span() / self.items_per_page as f64
    }

    pub fn content_size(&self) -> f64 {
        self.number_of_items.unwrap_or(0) as f64 * self.item_span()
    }

    pub fn max_content_offset(&self) -> f64 {
        (self.content_size() - self.page_span()).max(0.0)
    }

    pub fn clamp_content_offset(&self, offset: f64) -> f64 {
        offset.clamp(0.0, self.max_content_offset())
    }

    /// The (clamped) content offset that brings `index` to the leading edge.
    pub fn offset_for_item(&self, index: usize) -> f64 {
        self.clamp_content_offset(index as f64 * self.item_span())
    }

    /// The frame an item at `index` occupies in content coordinates.
    pub fn frame_for_item(&self, index: usize) -> Rect {
        self.layout().frame(index)
    }

    /// The leading item for the current offset.
    pub fn calculate_current_item_index(&self) -> usize {
        let span = self.item_span();
        if span <= 0.0 {
            return 0;
        }
        index_at(
            self.content_offset / span + INDEX_EPSILON,
            self.number_of_items.unwrap_or(0),
        )
    }

    pub fn visible_range(&self) -> Option<ItemRange> {
        self.visible_range_for(self.content_offset)
    }

    /// Visible indices for an arbitrary offset:
    /// `floor(offset / span) ..= floor((offset + viewport) / span)`, clamped to the item count.
    pub fn visible_range_for(&self, content_offset: f64) -> Option<ItemRange> {
        let count = self.number_of_items.filter(|&n| n > 0)?;
        let span = self.item_span();
        if span <= 0.0 {
            return None;
        }
        let view = self.viewport.main(self.options.orientation);
        let first = index_at(content_offset / span + INDEX_EPSILON, count);
        let last = index_at((content_offset + view) / span, count).max(first);
        Some(ItemRange { first, last })
    }

    pub fn first_visible_item_index(&self) -> Option<usize> {
        self.visible_range().map(|r| r.first)
    }

    pub fn last_visible_item_index(&self) -> Option<usize> {
        self.visible_range().map(|r| r.last)
    }

    pub fn number_of_visible_items(&self) -> usize {
        self.slots.len()
    }

    /// Live slots in ascending index order.
    pub fn visible_items(&self) -> impl Iterator<Item = &ItemSlot<I>> {
        self.slots.iter()
    }

    pub fn visible_items_mut(&mut self) -> impl Iterator<Item = &mut ItemSlot<I>> {
        self.slots.iter_mut()
    }

    /// The live instance at `index`, if that index is currently visible.
    pub fn item(&self, index: usize) -> Option<&I> {
        let pos = self.slot_position(index).ok()?;
        Some(&self.slots[pos].instance)
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut I> {
        let pos = self.slot_position(index).ok()?;
        Some(&mut self.slots[pos].instance)
    }

    pub fn pool(&self) -> &RecyclerPool<I> {
        &self.pool
    }

    /// Takes an idle instance from the recycler pool.
    pub fn dequeue_reusable_item(&mut self, reuse_key: &str) -> Option<I> {
        self.pool.dequeue(reuse_key)
    }

    pub fn has_next_page(&self) -> bool {
        let count = self.number_of_items.unwrap_or(0);
        self.last_item_index.saturating_add(self.items_per_page) < count
    }

    pub fn has_previous_page(&self) -> bool {
        self.number_of_items.is_some_and(|n| n > 0) && self.last_item_index > 0
    }

    pub fn move_to_next(&mut self, animated: bool) {
        if self.has_next_page() {
            self.move_to_item(self.last_item_index + self.items_per_page, animated);
        }
    }

    pub fn move_to_previous(&mut self, animated: bool) {
        if self.has_previous_page() {
            let index = self.last_item_index.saturating_sub(self.items_per_page);
            self.move_to_item(index, animated);
        }
    }

    /// Moves `index` to the leading edge.
    ///
    /// Out-of-range indices (including any index before the first `reload_data`) are ignored.
    /// Animated moves are advanced by `tick`; the current index and `did_change_items` are
    /// updated once the move completes.
    pub fn move_to_item(&mut self, index: usize, animated: bool) {
        let Some(count) = self.number_of_items else {
            return;
        };
        if index >= count {
            return;
        }

        let target = self.offset_for_item(index);
        vdebug!(index, animated, target, "move_to_item");
        if animated && (target - self.content_offset).abs() > INDEX_EPSILON {
            self.animation = Some(Tween::new(
                self.content_offset,
                target,
                self.options.animation_duration_ms,
                index,
            ));
            self.is_programmatic_move = true;
            return;
        }

        self.animation = None;
        self.is_programmatic_move = false;
        self.apply_content_offset(target, false);
        self.finish_move(index);
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn is_programmatic_move(&self) -> bool {
        self.is_programmatic_move
    }

    pub fn is_user_driven(&self) -> bool {
        self.is_user_driven
    }

    /// `true` while the strip itself is writing the content offset.
    ///
    /// Set for the duration of each offset write. Writes complete within one call, so
    /// callers only observe `false`; it is exposed for diagnostics.
    pub fn is_modifying_content_offset(&self) -> bool {
        self.is_modifying_content_offset
    }

    /// Advances an animated move.
    ///
    /// Returns the new content offset for the host to apply, or `None` when nothing is
    /// animating. The first tick after `move_to_item` starts the animation clock.
    pub fn tick(&mut self, now_ms: u64) -> Option<f64> {
        let mut tween = self.animation?;
        if tween.start_ms.is_none() {
            tween.start_ms = Some(now_ms);
        }

        if tween.is_done(now_ms) {
            self.animation = None;
            self.is_programmatic_move = false;
            self.apply_content_offset(tween.to, false);
            self.finish_move(tween.target_index);
        } else {
            self.animation = Some(tween);
            self.apply_content_offset(tween.sample(now_ms), false);
            self.update_fraction();
        }
        Some(self.content_offset)
    }

    /// Scroll-primitive notification: the content offset changed because of the user.
    ///
    /// Offsets within [`ECHO_TOLERANCE`] of the current one are the host echoing back what
    /// the strip wrote (possibly rounded to device pixels) and are ignored. Anything else
    /// cancels an animated move.
    pub fn on_scroll(&mut self, content_offset: f64) {
        if (content_offset - self.content_offset).abs() < ECHO_TOLERANCE {
            return;
        }
        if self.animation.take().is_some() {
            vdebug!("on_scroll: user scroll interrupts animated move");
            self.is_programmatic_move = false;
        }

        self.is_user_driven = true;
        self.content_offset = content_offset;
        self.layout_visible_items(false);
        self.update_fraction();

        if let Some(d) = self.delegate.as_mut() {
            d.did_scroll();
        }
        if self.number_of_items.is_some_and(|n| n > 0) {
            let current = self.calculate_current_item_index();
            if current != self.last_item_index {
                self.last_item_index = current;
                self.notify_did_change_items();
            }
        }
    }

    /// Scroll-primitive notification: the user let go and scrolling stopped.
    ///
    /// Settles the offset on the nearest item boundary.
    pub fn on_scroll_end(&mut self) {
        self.is_user_driven = false;
        let Some(count) = self.number_of_items.filter(|&n| n > 0) else {
            return;
        };
        let span = self.item_span();
        if span <= 0.0 || self.animation.is_some() {
            return;
        }

        let nearest = index_at((self.content_offset / span).round(), count);
        let target = self.offset_for_item(nearest);
        if (target - self.content_offset).abs() > INDEX_EPSILON {
            vtrace!(nearest, target, "on_scroll_end: settling");
            self.apply_content_offset(target, false);
        }
        self.update_fraction();
        if nearest != self.last_item_index {
            self.last_item_index = nearest;
            self.notify_did_change_items();
        }
    }

    pub fn resize_phase(&self) -> ResizePhase {
        self.geometry.phase()
    }

    /// First resize phase: captures the anchor under the current geometry.
    ///
    /// An animated move in progress is completed immediately so the anchor reflects its
    /// destination.
    pub fn will_resize(&mut self) {
        if let Some(tween) = self.animation.take() {
            self.is_programmatic_move = false;
            self.apply_content_offset(tween.to, false);
            self.finish_move(tween.target_index);
        }

        let anchor = self.capture_current_anchor();
        if self.number_of_items.is_some_and(|n| n > 0) {
            self.last_item_index = anchor.item_index;
        }
        self.fractional_position = anchor.fraction;
        self.geometry.capture(anchor);
    }

    /// Second resize phase: applies the new viewport and restores the captured anchor.
    ///
    /// If `will_resize` was not called, the anchor is captured here before the viewport
    /// changes.
    pub fn did_resize(&mut self, viewport: Size) {
        let anchor = match self.geometry.take_for_resize() {
            Some(anchor) => anchor,
            None => self.capture_current_anchor(),
        };

        self.viewport = viewport;
        let offset = anchored_offset(anchor, self.item_span());
        vdebug!(
            width = viewport.width,
            height = viewport.height,
            offset,
            "resize: restoring anchor"
        );
        self.geometry.mark_restored();
        self.apply_content_offset(offset, true);
        self.update_fraction();
        self.geometry.finish();
    }

    /// Runs both resize phases back to back.
    pub fn resize(&mut self, viewport: Size) {
        self.will_resize();
        self.did_resize(viewport);
    }

    pub fn scroll_state(&self) -> ScrollState {
        ScrollState {
            content_offset: self.content_offset,
            is_user_driven: self.is_user_driven,
            is_programmatic_move: self.is_programmatic_move,
            last_known_item_index: self.last_item_index,
            fractional_position_within_item: self.fractional_position,
        }
    }

    /// Re-anchors a previously captured [`ScrollState`] under the current geometry.
    ///
    /// The stored absolute offset is ignored; the item index and fraction are what survive
    /// across viewport sizes. The index is clamped into the current item count.
    pub fn restore_scroll_state(&mut self, state: ScrollState) {
        let count = self.number_of_items.unwrap_or(0);
        let item_index = state
            .last_known_item_index
            .min(count.saturating_sub(1));
        let anchor = ItemAnchor {
            item_index,
            fraction: state.fractional_position_within_item,
        };
        self.animation = None;
        self.is_programmatic_move = false;
        self.is_user_driven = false;
        self.apply_content_offset(anchored_offset(anchor, self.item_span()), false);
        self.last_item_index = item_index;
        self.update_fraction();
    }

    /// Tells the delegate that content for `index` arrived, if it neighbours the current item.
    pub fn notify_item_did_load(&mut self, index: usize) {
        let Some(d) = self.delegate.as_mut() else {
            return;
        };
        if index == self.last_item_index.saturating_add(1) {
            d.did_load_next();
        } else if self.last_item_index > 0 && index == self.last_item_index - 1 {
            d.did_load_previous();
        }
    }

    fn layout(&self) -> Layout {
        Layout {
            orientation: self.options.orientation,
            span: self.item_span(),
            margin: self.options.horizontal_margin / self.items_per_page as f64,
            cross: self.viewport.cross(self.options.orientation),
        }
    }

    fn capture_current_anchor(&self) -> ItemAnchor {
        capture_anchor(
            self.content_offset,
            self.item_span(),
            self.number_of_items.unwrap_or(0),
        )
    }

    fn slot_position(&self, index: usize) -> Result<usize, usize> {
        self.slots.binary_search_by_key(&index, |s| s.index)
    }

    /// Writes the content offset and rebuilds the visible window under the re-entrancy guard.
    fn apply_content_offset(&mut self, offset: f64, reframe_existing: bool) {
        self.is_modifying_content_offset = true;
        self.content_offset = offset;
        self.layout_visible_items(reframe_existing);
        self.is_modifying_content_offset = false;
    }

    fn finish_move(&mut self, index: usize) {
        self.last_item_index = index;
        self.update_fraction();
        self.notify_did_change_items();
    }

    fn update_fraction(&mut self) {
        self.fractional_position = self.capture_current_anchor().fraction;
    }

    fn notify_did_change_items(&mut self) {
        let current = self.last_item_index;
        if let Some(d) = self.delegate.as_mut() {
            d.did_change_items(current);
        }
    }

    /// Recycles slots that left the visible window and fills indices that entered it.
    ///
    /// With `reframe_existing`, kept slots receive their new frame with state preserved.
    fn layout_visible_items(&mut self, reframe_existing: bool) {
        let range = self.visible_range();
        let layout = self.layout();

        let mut kept = Vec::with_capacity(self.slots.len());
        for slot in mem::take(&mut self.slots) {
            if range.is_some_and(|r| r.contains(slot.index)) {
                kept.push(slot);
            } else {
                self.recycle(slot);
            }
        }
        self.slots = kept;

        if reframe_existing {
            for slot in &mut self.slots {
                slot.frame = layout.frame(slot.index);
                slot.instance.set_frame(slot.frame, true);
            }
        }

        let Some(range) = range else {
            return;
        };
        for index in range.iter() {
            let Err(pos) = self.slot_position(index) else {
                continue;
            };
            let Some(ds) = self.data_source.as_mut() else {
                return;
            };
            let reusable = self.pool.dequeue(ds.reuse_key(index));
            let mut instance = ds.item_view(index, reusable);
            instance.set_item_index(index);
            let frame = layout.frame(index);
            instance.set_frame(frame, false);
            if let Some(d) = self.delegate.as_mut() {
                d.will_display(&mut instance);
            }
            vtrace!(index, "display item");
            self.slots.insert(
                pos,
                ItemSlot {
                    index,
                    frame,
                    instance,
                },
            );
        }
    }

    fn recycle(&mut self, slot: ItemSlot<I>) {
        let ItemSlot {
            index,
            mut instance,
            ..
        } = slot;
        vtrace!(index, "recycle item");
        instance.on_disappear();
        if let Some(ds) = self.data_source.as_mut() {
            ds.cancel_load(index);
        }
        if let Some(d) = self.delegate.as_mut() {
            d.did_recycle(&mut instance);
        }
        self.pool.enqueue(instance);
    }
}

impl<I: fmt::Debug> fmt::Debug for StripView<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripView")
            .field("options", &self.options)
            .field("viewport", &self.viewport)
            .field("content_offset", &self.content_offset)
            .field("number_of_items", &self.number_of_items)
            .field("items_per_page", &self.items_per_page)
            .field("slots", &self.slots)
            .field("last_item_index", &self.last_item_index)
            .field("is_programmatic_move", &self.is_programmatic_move)
            .field("resize_phase", &self.geometry.phase())
            .finish_non_exhaustive()
    }
}
