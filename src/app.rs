//! Application state.
//!
//! [`App`] owns everything the screens show: the [`FeedController`], the
//! login form, the current theme and banner.  It never blocks: fetches,
//! seeding and sign-in go through the [`Worker`], and their results come
//! back through [`App::handle_msg`] on the next tick.
//!
//! ## For contributors
//!
//! Every controller call that can return a [`FetchTicket`] goes through
//! [`App::dispatch`], so there is exactly one place that starts fetches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::widgets::ListState;
use tracing::{debug, info, warn};

use crate::auth::{AuthError, Authenticator, Credentials, Session};
use crate::banner::{BannerKind, BannerSlot};
use crate::config::Config;
use crate::feed::{Arrival, FeedController, FeedOptions, FetchTicket};
use crate::source::{bootstrap_products, Category, Subscription};
use crate::theme::{Theme, ThemeMode};
use crate::worker::{Worker, WorkerMsg};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Products,
    /// Detail view of the product at this index.
    Detail(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub focus: LoginField,
    pub show_password: bool,
    /// A sign-in request is in flight.
    pub pending: bool,
    pub error: Option<String>,
}

impl LoginForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }
}

/// Everything [`App`] needs besides the worker.
pub struct AppOptions {
    pub feed: FeedOptions,
    /// Cycled by the category key; the first entry is active at start.
    pub categories: Vec<Category>,
    pub currency: String,
    pub end_reached_threshold: usize,
    pub theme: ThemeMode,
    pub banner_duration: Duration,
    pub authenticator: Option<Arc<dyn Authenticator>>,
    pub google_id_token: Option<String>,
}

impl AppOptions {
    pub fn from_config(config: &Config, authenticator: Option<Arc<dyn Authenticator>>) -> Self {
        Self {
            feed: config.feed_options(),
            categories: config.categories(),
            currency: config.ui.currency.clone(),
            end_reached_threshold: config.feed.end_reached_threshold,
            theme: config.ui.theme,
            banner_duration: Duration::from_millis(config.ui.banner_ms),
            authenticator,
            google_id_token: config.auth.google_id_token.clone(),
        }
    }
}

pub struct App {
    pub feed: FeedController,
    worker: Worker,
    pub screen: Screen,
    pub list_state: ListState,
    pub theme_mode: ThemeMode,
    pub banner: BannerSlot,
    pub login: LoginForm,
    pub session: Option<Session>,
    authenticator: Option<Arc<dyn Authenticator>>,
    google_id_token: Option<String>,
    subscription: Option<Subscription>,
    categories: Vec<Category>,
    category_index: usize,
    pub currency: String,
    end_reached_threshold: usize,
    /// Last status message for the status bar.
    pub status: String,
    pub quit: bool,
}

impl App {
    pub fn new(worker: Worker, mut options: AppOptions) -> Self {
        if options.categories.is_empty() {
            options.categories.push(Category::All);
        }
        let category_index = options
            .categories
            .iter()
            .position(|c| *c == options.feed.category)
            .unwrap_or(0);
        options.feed.category = options.categories[category_index].clone();

        let screen = if options.authenticator.is_some() {
            Screen::Login
        } else {
            Screen::Products
        };

        Self {
            feed: FeedController::new(options.feed),
            worker,
            screen,
            list_state: ListState::default(),
            theme_mode: options.theme,
            banner: BannerSlot::new(options.banner_duration),
            login: LoginForm::default(),
            session: None,
            authenticator: options.authenticator,
            google_id_token: options.google_id_token,
            subscription: None,
            categories: options.categories,
            category_index,
            currency: options.currency,
            end_reached_threshold: options.end_reached_threshold,
            status: "Starting…".into(),
            quit: false,
        }
    }

    /// Kick off the first load unless the login screen comes first.
    pub fn start(&mut self) {
        if self.screen == Screen::Products {
            self.open_feed();
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme_mode.palette()
    }

    pub fn source_name(&self) -> &str {
        self.worker.source_name()
    }

    fn open_feed(&mut self) {
        self.screen = Screen::Products;
        if self.subscription.is_none() {
            self.subscription = self.worker.subscribe();
        }
        if self.feed.products().is_empty() {
            let ticket = self.feed.request_more();
            self.dispatch(ticket);
        }
    }

    fn dispatch(&mut self, ticket: Option<FetchTicket>) {
        if let Some(ticket) = ticket {
            self.status = "Loading…".into();
            self.worker.fetch(ticket);
        }
    }

    // -- worker results ------------------------------------------------------

    pub fn handle_msg(&mut self, msg: WorkerMsg) {
        match msg {
            WorkerMsg::Page { generation, result } => {
                let arrival = match result {
                    Ok(page) => self.feed.page_arrived(generation, page),
                    Err(e) => self.feed.page_failed(generation, &e),
                };
                self.handle_arrival(arrival);
            }
            WorkerMsg::Seeded(Ok(count)) => {
                info!(count, "seed finished");
                if count > 0 {
                    self.banner
                        .show(BannerKind::Info, format!("Added {count} starter products"));
                }
                let ticket = self.feed.seed_finished();
                self.dispatch(ticket);
            }
            WorkerMsg::Seeded(Err(e)) => {
                warn!(error = %e, "seeding failed");
                self.status = format!("Error: {e}");
                self.banner.show(BannerKind::Error, "Could not seed products");
            }
            WorkerMsg::Inserted(product) => {
                let title = product.title.clone();
                let price = product.display_price(&self.currency);
                if self.feed.insert(product) {
                    self.banner.show(BannerKind::Success, "New product added").product =
                        Some((title, price));
                    self.select_initial();
                }
            }
            WorkerMsg::SignedIn(Ok(session)) => {
                self.login.pending = false;
                self.login.error = None;
                self.login.password.clear();
                info!(expires_at = %session.expires_at, "session started");
                self.banner
                    .show(BannerKind::Success, format!("Signed in as {}", session.email));
                self.session = Some(session);
                self.open_feed();
            }
            WorkerMsg::SignedIn(Err(e)) => {
                self.login.pending = false;
                self.login.error = Some(e.to_string());
                self.banner.show(BannerKind::Error, e.to_string());
            }
        }
    }

    fn handle_arrival(&mut self, arrival: Arrival) {
        match arrival {
            Arrival::Appended { added, exhausted } => {
                self.status = if exhausted {
                    format!("Loaded {added} products, end of list")
                } else {
                    format!("Loaded {added} products")
                };
                self.select_initial();
                self.maybe_load_more();
            }
            Arrival::Stale => {}
            Arrival::SeedRequested => {
                self.status = "Seeding products…".into();
                self.worker.seed(bootstrap_products());
            }
            Arrival::Retry(ticket) => {
                self.status = format!("Fetch failed, retrying in {:?}", ticket.delay);
                self.worker.fetch(ticket);
            }
            Arrival::GaveUp => {
                self.status = "Error: could not load products".into();
                self.banner.show(BannerKind::Error, "Could not load products");
            }
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.banner.tick(now);
    }

    // -- list screen ---------------------------------------------------------

    fn select_initial(&mut self) {
        if self.list_state.selected().is_none() && !self.feed.products().is_empty() {
            self.list_state.select(Some(0));
        }
    }

    /// Request the next page once the selection is within
    /// `end_reached_threshold` rows of the bottom.
    fn maybe_load_more(&mut self) {
        if self.screen != Screen::Products {
            return;
        }
        let len = self.feed.products().len();
        let Some(selected) = self.list_state.selected() else {
            return;
        };
        let remaining = len.saturating_sub(selected + 1);
        if remaining <= self.end_reached_threshold {
            debug!(remaining, cursor = ?self.feed.cursor(), "end of list reached");
            let ticket = self.feed.on_end_reached();
            self.dispatch(ticket);
        }
    }

    pub fn select_next(&mut self) {
        let len = self.feed.products().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.maybe_load_more();
    }

    pub fn select_previous(&mut self) {
        if self.feed.products().is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.feed.products().is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        let len = self.feed.products().len();
        if len > 0 {
            self.list_state.select(Some(len - 1));
            self.maybe_load_more();
        }
    }

    pub fn refresh(&mut self) {
        debug!(generation = self.feed.generation(), "refreshing feed");
        self.list_state.select(None);
        let ticket = self.feed.on_refresh();
        self.dispatch(ticket);
    }

    pub fn next_category(&mut self) {
        self.category_index = (self.category_index + 1) % self.categories.len();
        let category = self.categories[self.category_index].clone();
        self.list_state.select(None);
        let ticket = self.feed.on_category_change(category);
        self.dispatch(ticket);
    }

    pub fn toggle_theme(&mut self) {
        self.theme_mode = self.theme_mode.toggled();
    }

    pub fn open_detail(&mut self) {
        if let Some(i) = self.list_state.selected() {
            if i < self.feed.products().len() {
                self.screen = Screen::Detail(i);
            }
        }
    }

    pub fn back(&mut self) {
        if let Screen::Detail(_) = self.screen {
            self.screen = Screen::Products;
        }
    }

    // -- login screen --------------------------------------------------------

    pub fn login_input(&mut self, c: char) {
        self.login.focused_mut().push(c);
        self.login.error = None;
    }

    pub fn login_backspace(&mut self) {
        self.login.focused_mut().pop();
    }

    pub fn login_switch_field(&mut self) {
        self.login.focus = match self.login.focus {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }

    pub fn toggle_password_visibility(&mut self) {
        self.login.show_password = !self.login.show_password;
    }

    pub fn submit_login(&mut self) {
        let credentials = Credentials::password(&self.login.email, &self.login.password);
        self.sign_in(credentials);
    }

    pub fn submit_google_login(&mut self) {
        let credentials = Credentials::google(self.google_id_token.as_deref());
        self.sign_in(credentials);
    }

    fn sign_in(&mut self, credentials: Result<Credentials, AuthError>) {
        if self.login.pending {
            return;
        }
        let Some(auth) = self.authenticator.clone() else {
            return;
        };
        match credentials {
            Ok(credentials) => {
                self.login.pending = true;
                self.login.error = None;
                self.worker.sign_in(auth, credentials);
            }
            Err(e) => self.login.error = Some(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
