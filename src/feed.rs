//! Paginated product feed.
//!
//! [`FeedController`] owns the product list shown by the list screen and
//! decides when the next page may be requested.  It never performs I/O
//! itself: [`request_more`](FeedController::request_more) hands out a
//! [`FetchTicket`], the worker runs it against a
//! [`FeedSource`](crate::source::FeedSource), and the result comes back
//! through [`page_arrived`](FeedController::page_arrived) or
//! [`page_failed`](FeedController::page_failed).
//!
//! ```text
//!            request_more                page_arrived (full page)
//!   Idle ───────────────────► Loading ─────────────────────────► Idle
//!    ▲                          │  │
//!    │ reset                    │  └── short page / no cursor ──► Exhausted
//!    └──────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! Every ticket carries the generation that was current when it was issued.
//! `reset` bumps the generation, so a page that lands after a reset is
//! recognised as stale and dropped instead of being merged into fresh state.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::{debug, info, warn};

use crate::source::{Category, Cursor, FetchError, Page, PageRequest, Product, ProductKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Ready to load the next page.
    Idle,
    /// Exactly one request is in flight.
    Loading,
    /// No further page will be requested until reset.
    Exhausted,
}

/// How failed fetches are retried before the feed gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.max_delay,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOptions {
    pub page_size: NonZeroUsize,
    pub category: Category,
    /// Seed the backing store once if the very first page comes back empty.
    pub seed_on_empty: bool,
    pub retry: RetryPolicy,
}

/// A fetch the worker should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub request: PageRequest,
    /// Wait this long before fetching (retry backoff).
    pub delay: Duration,
}

/// What a finished fetch did to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arrival {
    /// The page was merged.
    Appended { added: usize, exhausted: bool },
    /// Issued before the last reset; ignored.
    Stale,
    /// The first page was empty: seed the store, then call
    /// [`FeedController::seed_finished`].
    SeedRequested,
    /// Run this ticket again after its delay.
    Retry(FetchTicket),
    /// Retries are spent; the feed is exhausted.
    GaveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeedStatus {
    Disabled,
    Available,
    Spent,
}

pub struct FeedController {
    products: Vec<Product>,
    keys: HashSet<ProductKey>,
    cursor: Option<Cursor>,
    phase: Phase,
    generation: u64,
    in_flight: Option<PageRequest>,
    page_size: NonZeroUsize,
    category: Category,
    seed: SeedStatus,
    retry: RetryPolicy,
    backoff: ExponentialBackoff,
    failures: u32,
}

impl FeedController {
    pub fn new(options: FeedOptions) -> Self {
        Self {
            products: Vec::new(),
            keys: HashSet::new(),
            cursor: None,
            phase: Phase::Idle,
            generation: 0,
            in_flight: None,
            page_size: options.page_size,
            category: options.category,
            seed: if options.seed_on_empty {
                SeedStatus::Available
            } else {
                SeedStatus::Disabled
            },
            backoff: options.retry.backoff(),
            retry: options.retry,
            failures: 0,
        }
    }

    // -- observables ---------------------------------------------------------

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn has_more(&self) -> bool {
        self.phase != Phase::Exhausted
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // -- rendering-layer triggers --------------------------------------------

    pub fn on_end_reached(&mut self) -> Option<FetchTicket> {
        self.request_more()
    }

    pub fn on_refresh(&mut self) -> Option<FetchTicket> {
        self.reset();
        self.request_more()
    }

    pub fn on_category_change(&mut self, category: Category) -> Option<FetchTicket> {
        info!(%category, "category changed");
        self.category = category;
        self.reset();
        self.request_more()
    }

    // -- state machine -------------------------------------------------------

    /// Start loading the next page, unless a request is already in flight or
    /// the feed is exhausted.
    pub fn request_more(&mut self) -> Option<FetchTicket> {
        match self.phase {
            Phase::Loading => {
                debug!("fetch already in flight, ignoring request");
                None
            }
            Phase::Exhausted => {
                debug!("feed exhausted, ignoring request");
                None
            }
            Phase::Idle => {
                let request = PageRequest {
                    page_size: self.page_size,
                    cursor: self.cursor.clone(),
                    category: self.category.clone(),
                };
                self.phase = Phase::Loading;
                self.in_flight = Some(request.clone());
                Some(FetchTicket {
                    generation: self.generation,
                    request,
                    delay: Duration::ZERO,
                })
            }
        }
    }

    fn accepts(&self, generation: u64) -> bool {
        generation == self.generation && self.phase == Phase::Loading
    }

    /// Merge a fetched page.
    pub fn page_arrived(&mut self, generation: u64, page: Page) -> Arrival {
        if !self.accepts(generation) {
            debug!(generation, current = self.generation, "dropping stale page");
            return Arrival::Stale;
        }
        let first_load = self
            .in_flight
            .take()
            .map_or(true, |request| request.cursor.is_none());
        self.failures = 0;
        self.backoff.reset();

        // Only the very first accepted page may ask for a seed.
        let may_seed = first_load && self.seed == SeedStatus::Available;
        if self.seed == SeedStatus::Available {
            self.seed = SeedStatus::Spent;
        }

        let received = page.products.len();
        let added = self.append(page.products);

        if may_seed && received == 0 {
            info!("first page is empty, requesting seed");
            self.phase = Phase::Exhausted;
            return Arrival::SeedRequested;
        }

        let mut exhausted = received < self.page_size.get();
        match page.next_cursor {
            Some(next) if advances(self.cursor.as_ref(), &next) => self.cursor = Some(next),
            Some(next) => {
                warn!(?next, current = ?self.cursor, "source returned a non-advancing cursor");
                exhausted = true;
            }
            None => exhausted = true,
        }

        self.phase = if exhausted { Phase::Exhausted } else { Phase::Idle };
        info!(received, added, total = self.products.len(), exhausted, "page merged");
        Arrival::Appended { added, exhausted }
    }

    /// Record a failed fetch.
    ///
    /// While retries remain the feed stays `Loading` and the same request is
    /// handed back with a backoff delay.  Afterwards the failure counts as an
    /// empty final page.
    pub fn page_failed(&mut self, generation: u64, error: &FetchError) -> Arrival {
        if !self.accepts(generation) {
            debug!(generation, %error, "dropping stale failure");
            return Arrival::Stale;
        }
        self.failures += 1;

        if self.failures <= self.retry.max_retries {
            if let (Some(request), Some(delay)) = (self.in_flight.clone(), self.backoff.next_backoff()) {
                warn!(%error, attempt = self.failures, ?delay, "fetch failed, retrying");
                return Arrival::Retry(FetchTicket {
                    generation,
                    request,
                    delay,
                });
            }
        }

        warn!(%error, attempts = self.failures, "fetch failed, giving up");
        self.failures = 0;
        self.backoff.reset();
        self.in_flight = None;
        self.phase = Phase::Exhausted;
        Arrival::GaveUp
    }

    /// Restart from the first page after seeding.  Runs at most once: the
    /// seed status is never re-armed.
    pub fn seed_finished(&mut self) -> Option<FetchTicket> {
        self.reset();
        self.request_more()
    }

    /// Merge a live insertion.  Returns `false` for duplicates and for
    /// products outside the active category.
    pub fn insert(&mut self, product: Product) -> bool {
        if let Some(filter) = self.category.as_filter() {
            if product.category.as_deref() != Some(filter) {
                return false;
            }
        }
        self.append(vec![product]) == 1
    }

    /// Back to an empty, loadable feed.  Anything still in flight becomes
    /// stale.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.products.clear();
        self.keys.clear();
        self.cursor = None;
        self.phase = Phase::Idle;
        self.in_flight = None;
        self.failures = 0;
        self.backoff.reset();
    }

    fn append(&mut self, products: Vec<Product>) -> usize {
        let before = self.products.len();
        for product in products {
            if self.keys.insert(product.key.clone()) {
                self.products.push(product);
            }
        }
        self.products.len() - before
    }
}

fn advances(current: Option<&Cursor>, next: &Cursor) -> bool {
    match (current, next) {
        (None, _) => true,
        (Some(Cursor::Offset(a)), Cursor::Offset(b)) => b > a,
        (Some(Cursor::After(a)), Cursor::After(b)) => b > a,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn product(id: u64) -> Product {
        Product {
            key: ProductKey::Numeric(id),
            title: format!("Product {id}"),
            price: 1.0,
            thumbnail: String::new(),
            description: String::new(),
            category: Some(if id % 2 == 0 { "even" } else { "odd" }.into()),
        }
    }

    fn page(ids: std::ops::Range<u64>, next: Option<usize>) -> Page {
        Page {
            products: ids.map(product).collect(),
            next_cursor: next.map(Cursor::Offset),
        }
    }

    fn options(seed_on_empty: bool) -> FeedOptions {
        FeedOptions {
            page_size: NonZeroUsize::new(10).unwrap(),
            category: Category::All,
            seed_on_empty,
            retry: RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            },
        }
    }

    fn controller() -> FeedController {
        FeedController::new(options(false))
    }

    fn keys(feed: &FeedController) -> Vec<ProductKey> {
        feed.products().iter().map(|p| p.key.clone()).collect()
    }

    #[test]
    fn starts_idle_and_empty() {
        let feed = controller();
        assert_eq!(feed.phase(), Phase::Idle);
        assert!(feed.has_more());
        assert!(!feed.is_loading());
        assert!(feed.products().is_empty());
        assert!(feed.cursor().is_none());
    }

    #[test]
    fn first_ticket_uses_initial_cursor() {
        let mut feed = controller();
        let ticket = feed.request_more().unwrap();
        assert_eq!(ticket.request.cursor, None);
        assert_eq!(ticket.request.page_size.get(), 10);
        assert_eq!(ticket.delay, Duration::ZERO);
        assert!(feed.is_loading());
    }

    #[test]
    fn second_request_while_loading_is_ignored() {
        let mut feed = controller();
        let first = feed.request_more();
        let second = feed.request_more();
        let third = feed.on_end_reached();

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(third.is_none());
    }

    #[test]
    fn three_full_pages_and_a_short_one_exhaust_at_34() {
        let mut feed = controller();
        let pages = [
            page(0..10, Some(10)),
            page(10..20, Some(20)),
            page(20..30, Some(30)),
            page(30..34, Some(34)),
        ];

        let mut fetches = 0;
        for p in pages {
            let ticket = feed.request_more().unwrap();
            fetches += 1;
            feed.page_arrived(ticket.generation, p);
        }

        assert_eq!(fetches, 4);
        assert_eq!(feed.products().len(), 34);
        assert_eq!(feed.phase(), Phase::Exhausted);
        assert!(feed.request_more().is_none());
    }

    #[test]
    fn cursor_advances_only_after_a_page_is_accepted() {
        let mut feed = controller();
        let ticket = feed.request_more().unwrap();
        assert!(feed.cursor().is_none());

        feed.page_arrived(ticket.generation, page(0..10, Some(10)));
        assert_eq!(feed.cursor(), Some(&Cursor::Offset(10)));

        let ticket = feed.request_more().unwrap();
        assert_eq!(ticket.request.cursor, Some(Cursor::Offset(10)));
    }

    #[test]
    fn short_page_exhausts_even_with_a_next_cursor() {
        let mut feed = controller();
        let ticket = feed.request_more().unwrap();
        let arrival = feed.page_arrived(ticket.generation, page(0..7, Some(7)));

        assert_eq!(
            arrival,
            Arrival::Appended {
                added: 7,
                exhausted: true
            }
        );
        assert!(!feed.has_more());
    }

    #[test]
    fn missing_next_cursor_exhausts_a_full_page() {
        let mut feed = controller();
        let ticket = feed.request_more().unwrap();
        feed.page_arrived(ticket.generation, page(0..10, None));

        assert_eq!(feed.phase(), Phase::Exhausted);
        assert!(feed.cursor().is_none());
    }

    #[test]
    fn overlapping_pages_never_duplicate_keys() {
        let mut feed = controller();
        let ticket = feed.request_more().unwrap();
        feed.page_arrived(ticket.generation, page(0..10, Some(5)));
        let ticket = feed.request_more().unwrap();
        let arrival = feed.page_arrived(ticket.generation, page(5..15, Some(15)));

        assert_eq!(
            arrival,
            Arrival::Appended {
                added: 5,
                exhausted: false
            }
        );
        let expected: Vec<_> = (0..15).map(ProductKey::Numeric).collect();
        assert_eq!(keys(&feed), expected);
    }

    #[test]
    fn non_advancing_cursor_stops_the_feed() {
        let mut feed = controller();
        let ticket = feed.request_more().unwrap();
        feed.page_arrived(ticket.generation, page(0..10, Some(10)));
        let ticket = feed.request_more().unwrap();
        feed.page_arrived(ticket.generation, page(10..20, Some(10)));

        assert_eq!(feed.cursor(), Some(&Cursor::Offset(10)));
        assert_eq!(feed.phase(), Phase::Exhausted);
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut feed = controller();
        let ticket = feed.request_more().unwrap();
        feed.page_arrived(ticket.generation, page(0..4, None));
        assert_eq!(feed.phase(), Phase::Exhausted);

        feed.reset();

        assert!(feed.products().is_empty());
        assert!(feed.cursor().is_none());
        assert!(feed.has_more());
        assert_eq!(feed.phase(), Phase::Idle);
        assert!(feed.request_more().is_some());
    }

    #[test]
    fn reset_while_loading_allows_a_fresh_request() {
        let mut feed = controller();
        feed.request_more().unwrap();
        feed.reset();
        assert!(feed.request_more().is_some());
    }

    #[test]
    fn stale_page_after_reset_is_discarded() {
        let mut feed = controller();
        let stale = feed.request_more().unwrap();
        let fresh = feed.on_refresh().unwrap();
        assert_ne!(stale.generation, fresh.generation);

        assert_eq!(
            feed.page_arrived(stale.generation, page(100..110, Some(110))),
            Arrival::Stale
        );
        assert!(feed.products().is_empty());
        assert!(feed.is_loading());

        feed.page_arrived(fresh.generation, page(0..10, Some(10)));
        let expected: Vec<_> = (0..10).map(ProductKey::Numeric).collect();
        assert_eq!(keys(&feed), expected);
    }

    #[test]
    fn stale_failure_after_reset_is_discarded() {
        let mut feed = controller();
        let stale = feed.request_more().unwrap();
        feed.reset();
        assert_eq!(
            feed.page_failed(stale.generation, &FetchError::Unsupported("test")),
            Arrival::Stale
        );
        assert_eq!(feed.phase(), Phase::Idle);
    }

    #[test]
    fn duplicate_insertion_is_ignored() {
        let mut feed = controller();
        let ticket = feed.request_more().unwrap();
        feed.page_arrived(ticket.generation, page(0..10, Some(10)));

        assert!(!feed.insert(product(3)));
        assert_eq!(feed.products().len(), 10);

        assert!(feed.insert(product(99)));
        assert_eq!(feed.products().len(), 11);
    }

    #[test]
    fn insertion_outside_active_category_is_ignored() {
        let mut feed = controller();
        feed.on_category_change(Category::Named("even".into()));

        assert!(!feed.insert(product(1)));
        assert!(feed.insert(product(2)));
    }

    #[test]
    fn category_change_resets_and_requests_filtered_page() {
        let mut feed = controller();
        let ticket = feed.request_more().unwrap();
        feed.page_arrived(ticket.generation, page(0..10, Some(10)));

        let ticket = feed
            .on_category_change(Category::Named("odd".into()))
            .unwrap();

        assert!(feed.products().is_empty());
        assert_eq!(ticket.request.cursor, None);
        assert_eq!(ticket.request.category, Category::Named("odd".into()));
    }

    #[test]
    fn empty_first_page_requests_a_seed() {
        let mut feed = FeedController::new(options(true));

        let ticket = feed.request_more().unwrap();
        assert_eq!(
            feed.page_arrived(ticket.generation, Page::default()),
            Arrival::SeedRequested
        );
        assert_eq!(feed.phase(), Phase::Exhausted);

        let retry = feed.seed_finished().unwrap();
        assert_eq!(retry.request.cursor, None);
        assert_ne!(retry.generation, ticket.generation);

        feed.page_arrived(retry.generation, page(0..10, Some(10)));
        assert_eq!(feed.products().len(), 10);
        assert_eq!(feed.phase(), Phase::Idle);
    }

    #[test]
    fn empty_retry_after_seed_does_not_seed_again() {
        let mut feed = FeedController::new(options(true));
        let ticket = feed.request_more().unwrap();
        feed.page_arrived(ticket.generation, Page::default());

        let retry = feed.seed_finished().unwrap();
        let arrival = feed.page_arrived(retry.generation, Page::default());

        assert_eq!(
            arrival,
            Arrival::Appended {
                added: 0,
                exhausted: true
            }
        );
        assert_eq!(feed.phase(), Phase::Exhausted);
        assert!(feed.products().is_empty());
        assert!(feed.request_more().is_none());

        // A manual refresh that comes back empty does not seed again either.
        let ticket = feed.on_refresh().unwrap();
        assert_ne!(
            feed.page_arrived(ticket.generation, Page::default()),
            Arrival::SeedRequested
        );
    }

    #[test]
    fn empty_category_after_a_full_first_page_does_not_seed() {
        let mut feed = FeedController::new(options(true));
        let ticket = feed.request_more().unwrap();
        feed.page_arrived(ticket.generation, page(0..10, Some(10)));

        let ticket = feed
            .on_category_change(Category::Named("empty".to_string()))
            .unwrap();
        assert_eq!(
            feed.page_arrived(ticket.generation, Page::default()),
            Arrival::Appended {
                added: 0,
                exhausted: true
            }
        );

        let ticket = feed.on_refresh().unwrap();
        assert_ne!(
            feed.page_arrived(ticket.generation, Page::default()),
            Arrival::SeedRequested
        );
    }

    #[test]
    fn empty_first_page_without_seeding_just_exhausts() {
        let mut feed = controller();
        let ticket = feed.request_more().unwrap();
        assert_eq!(
            feed.page_arrived(ticket.generation, Page::default()),
            Arrival::Appended {
                added: 0,
                exhausted: true
            }
        );
    }

    #[test]
    fn failure_without_retries_fails_soft_to_exhausted() {
        let mut feed = controller();
        let ticket = feed.request_more().unwrap();
        feed.page_arrived(ticket.generation, page(0..10, Some(10)));

        let ticket = feed.request_more().unwrap();
        let arrival = feed.page_failed(ticket.generation, &FetchError::Unsupported("test"));

        assert_eq!(arrival, Arrival::GaveUp);
        assert_eq!(feed.products().len(), 10);
        assert!(!feed.has_more());
        assert!(!feed.is_loading());
    }

    #[test]
    fn failures_retry_with_growing_backoff_then_give_up() {
        let mut feed = FeedController::new(FeedOptions {
            retry: RetryPolicy {
                max_retries: 2,
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(1),
            },
            ..options(false)
        });
        let ticket = feed.request_more().unwrap();
        let error = FetchError::Unsupported("test");

        let Arrival::Retry(first) = feed.page_failed(ticket.generation, &error) else {
            panic!("expected a retry");
        };
        assert_eq!(first.delay, Duration::from_millis(100));
        assert_eq!(first.request, ticket.request);
        assert!(feed.is_loading());
        assert!(feed.request_more().is_none());

        let Arrival::Retry(second) = feed.page_failed(first.generation, &error) else {
            panic!("expected a retry");
        };
        assert_eq!(second.delay, Duration::from_millis(200));

        assert_eq!(feed.page_failed(second.generation, &error), Arrival::GaveUp);
        assert_eq!(feed.phase(), Phase::Exhausted);
    }

    #[test]
    fn successful_page_clears_the_failure_count() {
        let mut feed = FeedController::new(FeedOptions {
            retry: RetryPolicy {
                max_retries: 1,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(10),
            },
            ..options(false)
        });
        let error = FetchError::Unsupported("test");

        let ticket = feed.request_more().unwrap();
        assert!(matches!(feed.page_failed(ticket.generation, &error), Arrival::Retry(_)));
        feed.page_arrived(ticket.generation, page(0..10, Some(10)));

        let ticket = feed.request_more().unwrap();
        assert!(matches!(feed.page_failed(ticket.generation, &error), Arrival::Retry(_)));
    }
}
