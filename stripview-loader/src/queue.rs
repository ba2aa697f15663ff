use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::mem;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::{Condvar, Mutex};

use crate::cache::CacheStore;
use crate::{CacheCategory, CacheStats, Fetch, FetchError, LoaderError, PixelCost};

/// Default pixel budget of the default cache: three mebipixels.
pub const DEFAULT_PIXEL_BUDGET: u64 = 3 * 1024 * 1024;

/// Default number of fetches that may run at the same time.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Scheduling priority of a queued fetch. Higher priorities start first; equal priorities
/// start in request order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Priority {
    VeryLow,
    Low,
    #[default]
    Normal,
    High,
    VeryHigh,
}

/// Configuration for [`LoadQueue`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QueueOptions {
    /// Worker threads, and so the maximum number of fetches in flight.
    pub max_concurrent: usize,
    /// Priority used when a request does not name one.
    pub default_priority: Priority,
    /// Budget of the default cache and of categories created on first use.
    pub default_pixel_budget: u64,
    /// Categories registered up front, with their budgets.
    pub categories: Vec<(CacheCategory, u64)>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            default_priority: Priority::Normal,
            default_pixel_budget: DEFAULT_PIXEL_BUDGET,
            categories: Vec::new(),
        }
    }
}

impl QueueOptions {
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }

    pub fn with_default_pixel_budget(mut self, budget: u64) -> Self {
        self.default_pixel_budget = budget;
        self
    }

    pub fn with_category(mut self, category: impl Into<CacheCategory>, budget: u64) -> Self {
        self.categories.push((category.into(), budget));
        self
    }
}

/// Lifecycle of one `(photo_index, category)` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestState {
    Queued,
    InFlight,
    /// In flight, but its result will be dropped.
    Cancelled,
    /// The content is in the cache.
    Completed,
}

/// Identifies one caller of [`LoadQueue::request_load`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecipientId(u64);

/// How a request was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    /// Already cached; delivered by the next `poll`.
    Cached,
    /// Joined a request already queued or in flight.
    Attached,
    /// A new fetch was queued.
    Enqueued,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub recipient: RecipientId,
    pub status: LoadStatus,
}

/// Loaded content for one recipient.
#[derive(Debug)]
pub struct Completion<V> {
    pub image: Arc<V>,
    pub photo_index: usize,
    pub category: CacheCategory,
    pub recipient: RecipientId,
}

/// Receives completions drained by [`LoadQueue::dispatch`].
pub trait LoadObserver<V> {
    fn on_loaded(&mut self, image: &Arc<V>, photo_index: usize, category: &CacheCategory);
}

impl<V, F> LoadObserver<V> for F
where
    F: FnMut(&Arc<V>, usize, &CacheCategory),
{
    fn on_loaded(&mut self, image: &Arc<V>, photo_index: usize, category: &CacheCategory) {
        self(image, photo_index, category)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct RequestKey {
    photo_index: usize,
    category: CacheCategory,
}

#[derive(Debug)]
struct PendingRequest {
    id: u64,
    source: Arc<str>,
    priority: Priority,
    state: RequestState,
    recipients: Vec<RecipientId>,
}

/// Heap entry. A request whose priority is raised while queued gets a second entry; whichever
/// pops first starts the fetch and the other is skipped.
#[derive(Debug)]
struct QueuedTask {
    priority: Priority,
    seq: u64,
    id: u64,
    key: RequestKey,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Job {
    id: u64,
    key: RequestKey,
    source: Arc<str>,
}

struct Outcome<V> {
    id: u64,
    key: RequestKey,
    result: Result<V, FetchError>,
}

struct State<V> {
    caches: CacheStore<V>,
    pending: HashMap<RequestKey, PendingRequest>,
    heap: BinaryHeap<QueuedTask>,
    // Cache hits waiting for the next poll.
    ready: Vec<Completion<V>>,
    next_id: u64,
    next_seq: u64,
    next_recipient: u64,
    shutdown: bool,
}

impl<V> State<V> {
    /// Pops the next live task and marks it in flight.
    fn next_job(&mut self) -> Option<Job> {
        while let Some(task) = self.heap.pop() {
            let Some(req) = self.pending.get_mut(&task.key) else {
                continue;
            };
            if req.id != task.id || req.state != RequestState::Queued {
                continue;
            }
            req.state = RequestState::InFlight;
            return Some(Job {
                id: task.id,
                key: task.key,
                source: Arc::clone(&req.source),
            });
        }
        None
    }

    fn push_task(&mut self, priority: Priority, id: u64, key: RequestKey) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedTask {
            priority,
            seq,
            id,
            key,
        });
    }
}

struct Shared<V> {
    state: Mutex<State<V>>,
    work_ready: Condvar,
    fetcher: Box<dyn Fetch<V>>,
}

/// Deduplicating, cancellable content loader with per-category pixel-budget caches.
///
/// Fetches run on a fixed pool of worker threads. Their results come back over a channel
/// and are only applied when the owner calls [`LoadQueue::poll`] (or `poll_timeout` /
/// `dispatch`): that is where entries are cached and completions handed out, so all
/// observable effects happen on the polling thread.
///
/// At most one fetch exists per `(photo_index, category)`. Further requests for the same pair
/// attach to it and each receives its own [`Completion`].
pub struct LoadQueue<V> {
    shared: Arc<Shared<V>>,
    completions: Receiver<Outcome<V>>,
    workers: Vec<JoinHandle<()>>,
    default_priority: Priority,
}

impl<V> LoadQueue<V>
where
    V: PixelCost + Send + Sync + 'static,
{
    pub fn new(fetcher: impl Fetch<V>, options: QueueOptions) -> Result<Self, LoaderError> {
        if options.max_concurrent == 0 {
            return Err(LoaderError::ZeroConcurrency);
        }

        let mut caches = CacheStore::new(options.default_pixel_budget);
        for (category, budget) in options.categories {
            caches.register(category, budget);
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                caches,
                pending: HashMap::new(),
                heap: BinaryHeap::new(),
                ready: Vec::new(),
                next_id: 0,
                next_seq: 0,
                next_recipient: 0,
                shutdown: false,
            }),
            work_ready: Condvar::new(),
            fetcher: Box::new(fetcher),
        });
        let (done_tx, done_rx) = unbounded();

        let mut queue = Self {
            shared,
            completions: done_rx,
            workers: Vec::with_capacity(options.max_concurrent),
            default_priority: options.default_priority,
        };
        for n in 0..options.max_concurrent {
            let shared = Arc::clone(&queue.shared);
            let done = done_tx.clone();
            // On error `queue` is dropped, which stops the workers spawned so far.
            let handle = thread::Builder::new()
                .name(format!("stripview-loader-{n}"))
                .spawn(move || worker_loop(shared, done))
                .map_err(LoaderError::Spawn)?;
            queue.workers.push(handle);
        }
        vdebug!(workers = options.max_concurrent, "LoadQueue::new");
        Ok(queue)
    }

    /// A queue with default options and the given categories registered.
    pub fn with_categories<C>(
        fetcher: impl Fetch<V>,
        categories: impl IntoIterator<Item = (C, u64)>,
    ) -> Result<Self, LoaderError>
    where
        C: Into<CacheCategory>,
    {
        let options = QueueOptions {
            categories: categories
                .into_iter()
                .map(|(c, budget)| (c.into(), budget))
                .collect(),
            ..QueueOptions::default()
        };
        Self::new(fetcher, options)
    }

    /// Creates a bounded cache for `category`, or changes its budget (evicting oldest entries
    /// if it shrank).
    pub fn register_category(&self, category: impl Into<CacheCategory>, max_pixel_budget: u64) {
        let category = category.into();
        vdebug!(%category, max_pixel_budget, "register_category");
        self.shared
            .state
            .lock()
            .caches
            .register(category, max_pixel_budget);
    }

    /// Stats of the cache reserved for requests without a category.
    pub fn default_cache(&self) -> CacheStats {
        self.shared
            .state
            .lock()
            .caches
            .ensure(&CacheCategory::Default)
            .stats()
    }

    pub fn cache_stats(&self, category: &CacheCategory) -> Option<CacheStats> {
        self.shared
            .state
            .lock()
            .caches
            .get(category)
            .map(|c| c.stats())
    }

    /// Requests content for `photo_index` in `category`.
    ///
    /// A cached entry is delivered by the next `poll`. Otherwise the caller attaches to a
    /// pending request for the same pair, or a new fetch is queued at `priority` (the
    /// queue's default priority when `None`). Attaching with a higher priority than the
    /// queued request promotes it.
    pub fn request_load(
        &self,
        photo_index: usize,
        category: impl Into<CacheCategory>,
        source: &str,
        priority: Option<Priority>,
    ) -> LoadTicket {
        let category = category.into();
        let priority = priority.unwrap_or(self.default_priority);
        let mut state = self.shared.state.lock();
        let recipient = RecipientId(state.next_recipient);
        state.next_recipient += 1;

        if !state.caches.is_registered(&category) {
            vwarn!(%category, "request for unregistered category; using the default budget");
            state.caches.ensure(&category);
        }

        if let Some(image) = state.caches.lookup(&category, photo_index) {
            vtrace!(photo_index, %category, "request_load: cache hit");
            state.ready.push(Completion {
                image,
                photo_index,
                category,
                recipient,
            });
            return LoadTicket {
                recipient,
                status: LoadStatus::Cached,
            };
        }

        let key = RequestKey {
            photo_index,
            category,
        };
        if let Some(req) = state.pending.get_mut(&key) {
            req.recipients.push(recipient);
            let promote = match req.state {
                RequestState::Cancelled => {
                    req.state = RequestState::InFlight;
                    None
                }
                RequestState::Queued if priority > req.priority => {
                    req.priority = priority;
                    Some(req.id)
                }
                _ => None,
            };
            vtrace!(photo_index, recipients = req.recipients.len(), "request_load: attached");
            if let Some(id) = promote {
                state.push_task(priority, id, key);
                self.shared.work_ready.notify_one();
            }
            return LoadTicket {
                recipient,
                status: LoadStatus::Attached,
            };
        }

        let id = state.next_id;
        state.next_id += 1;
        state.pending.insert(
            key.clone(),
            PendingRequest {
                id,
                source: Arc::from(source),
                priority,
                state: RequestState::Queued,
                recipients: vec![recipient],
            },
        );
        vtrace!(photo_index, ?priority, "request_load: enqueued");
        state.push_task(priority, id, key);
        self.shared.work_ready.notify_one();
        LoadTicket {
            recipient,
            status: LoadStatus::Enqueued,
        }
    }

    /// Cancels every recipient of `(photo_index, category)`. Never blocks.
    ///
    /// A queued request is dropped before it starts. An in-flight fetch runs to completion
    /// but its result is neither cached nor delivered. Undelivered cache hits for the pair
    /// are dropped too.
    pub fn cancel(&self, photo_index: usize, category: impl Into<CacheCategory>) {
        let key = RequestKey {
            photo_index,
            category: category.into(),
        };
        let mut state = self.shared.state.lock();
        state
            .ready
            .retain(|c| c.photo_index != key.photo_index || c.category != key.category);

        let Some(req) = state.pending.get_mut(&key) else {
            return;
        };
        match req.state {
            RequestState::Queued => {
                vtrace!(photo_index, "cancel: dropped queued request");
                state.pending.remove(&key);
            }
            RequestState::InFlight => {
                vtrace!(photo_index, "cancel: in-flight result will be dropped");
                req.state = RequestState::Cancelled;
                req.recipients.clear();
            }
            RequestState::Cancelled | RequestState::Completed => {}
        }
    }

    /// Synchronous cache lookup.
    pub fn image_at(&self, photo_index: usize, category: &CacheCategory) -> Option<Arc<V>> {
        self.shared.state.lock().caches.lookup(category, photo_index)
    }

    /// Drops every cached entry of `category`. Pending requests are unaffected.
    pub fn reset_category(&self, category: &CacheCategory) {
        vdebug!(%category, "reset_category");
        self.shared.state.lock().caches.reset(category);
    }

    /// Drops every cached entry of every category (e.g. under memory pressure).
    pub fn unload_caches(&self) {
        vdebug!("unload_caches");
        self.shared.state.lock().caches.clear_all();
    }

    /// Requests queued or in flight, including cancelled fetches that have not returned yet.
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    pub fn request_state(
        &self,
        photo_index: usize,
        category: &CacheCategory,
    ) -> Option<RequestState> {
        let state = self.shared.state.lock();
        let key = RequestKey {
            photo_index,
            category: category.clone(),
        };
        if let Some(req) = state.pending.get(&key) {
            return Some(req.state);
        }
        state
            .caches
            .get(category)
            .filter(|c| c.contains(photo_index))
            .map(|_| RequestState::Completed)
    }

    /// Applies finished fetches and returns every completion ready for delivery.
    ///
    /// Never blocks on a fetch.
    pub fn poll(&self) -> Vec<Completion<V>> {
        let mut out = mem::take(&mut self.shared.state.lock().ready);
        while let Ok(outcome) = self.completions.try_recv() {
            self.settle(outcome, &mut out);
        }
        out
    }

    /// Like `poll`, but waits up to `timeout` for at least one completion.
    pub fn poll_timeout(&self, timeout: Duration) -> Vec<Completion<V>> {
        let deadline = Instant::now() + timeout;
        loop {
            let out = self.poll();
            if !out.is_empty() {
                return out;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completions.recv_timeout(remaining) {
                Ok(outcome) => {
                    let mut out = Vec::new();
                    self.settle(outcome, &mut out);
                    out.extend(self.poll());
                    if !out.is_empty() {
                        return out;
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    return Vec::new();
                }
            }
        }
    }

    /// Polls and hands each completion to `observer`. Returns how many were delivered.
    pub fn dispatch(&self, observer: &mut dyn LoadObserver<V>) -> usize {
        let completions = self.poll();
        for c in &completions {
            observer.on_loaded(&c.image, c.photo_index, &c.category);
        }
        completions.len()
    }

    /// Stops the workers and waits for them. Fetches already running finish first.
    pub fn shutdown(mut self) {
        self.signal_shutdown();
        for handle in mem::take(&mut self.workers) {
            if handle.join().is_err() {
                vwarn!("loader worker panicked");
            }
        }
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn settle(&self, outcome: Outcome<V>, out: &mut Vec<Completion<V>>) {
        let Outcome { id, key, result } = outcome;
        let mut state = self.shared.state.lock();
        if state.pending.get(&key).is_none_or(|r| r.id != id) {
            return;
        }
        let Some(req) = state.pending.remove(&key) else {
            return;
        };

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                vwarn!(
                    photo_index = key.photo_index,
                    category = %key.category,
                    source = %req.source,
                    error = %err,
                    "fetch failed"
                );
                return;
            }
        };
        if req.state == RequestState::Cancelled {
            vtrace!(photo_index = key.photo_index, "settle: dropping cancelled result");
            return;
        }

        let pixels = value.pixel_count();
        let image = Arc::new(value);
        let stored = state
            .caches
            .ensure(&key.category)
            .insert(key.photo_index, Arc::clone(&image), pixels);
        if !stored {
            vdebug!(
                photo_index = key.photo_index,
                pixels,
                "settle: larger than the category budget, not cached"
            );
        }
        for recipient in req.recipients {
            out.push(Completion {
                image: Arc::clone(&image),
                photo_index: key.photo_index,
                category: key.category.clone(),
                recipient,
            });
        }
    }
}

impl<V> LoadQueue<V> {
    fn signal_shutdown(&self) {
        self.shared.state.lock().shutdown = true;
        self.shared.work_ready.notify_all();
    }
}

// Dropping does not join; idle workers exit on wakeup, busy ones after their fetch.
impl<V> Drop for LoadQueue<V> {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

impl<V> fmt::Debug for LoadQueue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("LoadQueue")
            .field("workers", &self.workers.len())
            .field("pending", &state.pending.len())
            .field("queued", &state.heap.len())
            .field("default_priority", &self.default_priority)
            .finish_non_exhaustive()
    }
}

fn worker_loop<V: 'static>(shared: Arc<Shared<V>>, done: Sender<Outcome<V>>) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if state.shutdown {
                    return;
                }
                if let Some(job) = state.next_job() {
                    break job;
                }
                shared.work_ready.wait(&mut state);
            }
        };

        let result = shared.fetcher.fetch(&job.source);
        let outcome = Outcome {
            id: job.id,
            key: job.key,
            result,
        };
        if done.send(outcome).is_err() {
            return;
        }
    }
}
