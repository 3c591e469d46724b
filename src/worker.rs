//! Background work.
//!
//! Page fetches, seeding and sign-in all block on I/O, so each runs on its
//! own thread and reports back to the UI thread over an [`mpsc`] channel.
//! The UI thread drains the receiver once per tick and feeds the results to
//! the [`FeedController`](crate::feed::FeedController).
//!
//! ## For contributors
//!
//! The worker does not decide *when* to fetch; the controller does.  It
//! also never drops results: stale pages are recognised by their generation
//! on the UI side.  Keep it that way so the single-request guard lives in
//! one place.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::auth::{AuthError, Authenticator, Credentials, Session};
use crate::feed::FetchTicket;
use crate::source::{FeedSource, FetchError, Page, Product, Subscription};
use crate::store::StoredProduct;

/// Messages sent from worker threads to the UI thread.
#[derive(Debug)]
pub enum WorkerMsg {
    /// A page fetch finished.
    Page {
        generation: u64,
        result: Result<Page, FetchError>,
    },
    /// Seeding finished with this many inserted products.
    Seeded(Result<usize, FetchError>),
    /// The backing store gained a product.
    Inserted(Product),
    /// A sign-in attempt finished.
    SignedIn(Result<Session, AuthError>),
}

pub struct Worker {
    source: Arc<dyn FeedSource>,
    tx: mpsc::Sender<WorkerMsg>,
}

impl Worker {
    /// Create a worker for `source`.
    ///
    /// Returns the receiver the main loop should drain on every tick.
    pub fn new(source: Arc<dyn FeedSource>) -> (Self, mpsc::Receiver<WorkerMsg>) {
        let (tx, rx) = mpsc::channel();
        (Self { source, tx }, rx)
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Run `ticket` on a fresh thread, after its delay.
    pub fn fetch(&self, ticket: FetchTicket) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        thread::spawn(move || {
            if !ticket.delay.is_zero() {
                thread::sleep(ticket.delay);
            }
            let result = source.fetch_page(&ticket.request);
            // If the receiver is gone the UI has exited; nothing to do.
            if tx
                .send(WorkerMsg::Page {
                    generation: ticket.generation,
                    result,
                })
                .is_err()
            {
                debug!("ui gone, dropping page");
            }
        });
    }

    pub fn seed(&self, products: Vec<StoredProduct>) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let _ = tx.send(WorkerMsg::Seeded(source.seed(&products)));
        });
    }

    /// Forward the source's insertions as [`WorkerMsg::Inserted`].
    ///
    /// `None` when the source has no change stream.
    pub fn subscribe(&self) -> Option<Subscription> {
        let tx = self.tx.clone();
        self.source.subscribe_to_insertions(Box::new(move |product| {
            let _ = tx.send(WorkerMsg::Inserted(product));
        }))
    }

    pub fn sign_in(&self, auth: Arc<dyn Authenticator>, credentials: Credentials) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let _ = tx.send(WorkerMsg::SignedIn(auth.sign_in(&credentials)));
        });
    }
}
