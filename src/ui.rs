//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).  Every colour comes from the
//! [`Theme`] the app hands out, so switching themes needs no changes here.
//!
//! ## For contributors
//!
//! * Each screen has one `draw_*` function; [`draw`] picks it and adds the
//!   banner and status bar, which are shared by all screens.
//! * [`ratatui`] is the TUI framework; see its docs for widget details.

use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, LoginField, Screen};
use crate::banner::{Banner, BannerKind};
use crate::feed::Phase;
use crate::theme::Theme;

/// Draw the complete UI for one frame.
///
/// Called once per tick from the main loop.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let theme = app.theme();
    frame.render_widget(Block::default().style(theme.base()), frame.area());

    let banner_height = if app.banner.current().is_some() { 3 } else { 0 };
    let [main_area, banner_area, status_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(banner_height),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    match app.screen {
        Screen::Login => draw_login(app, &theme, frame, main_area),
        Screen::Products => draw_product_list(app, &theme, frame, main_area),
        Screen::Detail(index) => draw_detail(app, index, &theme, frame, main_area),
    }
    if let Some(banner) = app.banner.current() {
        draw_banner(banner, &theme, frame, banner_area);
    }
    draw_status_bar(app, &theme, frame, status_area);
}

// ---------------------------------------------------------------------------
// Product list
// ---------------------------------------------------------------------------

fn draw_product_list(app: &mut App, theme: &Theme, frame: &mut Frame, area: Rect) {
    let title = format!(" {} · {} ", app.source_name(), app.feed.category());
    let block = Block::default()
        .title(Span::styled(title, theme.title()))
        .borders(Borders::ALL)
        .border_style(theme.muted());

    if app.feed.products().is_empty() {
        let message = if app.feed.is_loading() {
            "Loading products..."
        } else {
            "No products"
        };
        let placeholder = Paragraph::new(Line::from(Span::styled(message, theme.muted())))
            .block(block)
            .centered();
        frame.render_widget(placeholder, area);
        return;
    }

    let footer = match app.feed.phase() {
        Phase::Loading => Some("Loading more…"),
        Phase::Exhausted => Some("No more products"),
        Phase::Idle => None,
    };
    let footer_height = if footer.is_some() { 1 } else { 0 };
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let [list_area, footer_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(footer_height)]).areas(inner);

    let currency = app.currency.clone();
    let list_items: Vec<ListItem> = app
        .feed
        .products()
        .iter()
        .map(|product| {
            let line = Line::from(vec![
                Span::styled(
                    format!("{:>12}", product.display_price(&currency)),
                    theme.price(),
                ),
                Span::raw("  "),
                Span::styled(&product.title, Style::default().fg(theme.text)),
                Span::raw("  "),
                Span::styled(
                    product
                        .category
                        .as_deref()
                        .map(|c| format!("[{c}]"))
                        .unwrap_or_default(),
                    theme.muted(),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(list_items)
        .highlight_style(theme.highlight())
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, list_area, &mut app.list_state);

    if let Some(footer) = footer {
        let footer = Paragraph::new(Span::styled(footer, theme.muted())).centered();
        frame.render_widget(footer, footer_area);
    }
}

// ---------------------------------------------------------------------------
// Detail
// ---------------------------------------------------------------------------

fn draw_detail(app: &App, index: usize, theme: &Theme, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Product Detail ", theme.title()))
        .borders(Borders::ALL)
        .border_style(theme.muted());

    let Some(product) = app.feed.products().get(index) else {
        frame.render_widget(Paragraph::new("Product no longer available").block(block), area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            product.title.as_str(),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(product.display_price(&app.currency), theme.price())),
    ];
    if let Some(category) = &product.category {
        lines.push(Line::from(Span::styled(format!("Category: {category}"), theme.muted())));
    }
    lines.push(Line::default());
    lines.push(Line::from(product.description.as_str()));
    lines.push(Line::default());
    lines.push(Line::from(vec![
        Span::styled("Image: ", theme.muted()),
        Span::raw(product.thumbnail.as_str()),
    ]));

    let detail = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(detail, area);
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

fn draw_login(app: &App, theme: &Theme, frame: &mut Frame, area: Rect) {
    let [form_area] = Layout::horizontal([Constraint::Max(56)])
        .flex(Flex::Center)
        .areas(area);
    let [form_area] = Layout::vertical([Constraint::Length(11)])
        .flex(Flex::Center)
        .areas(form_area);

    let block = Block::default()
        .title(Span::styled(" Sign in ", theme.title()))
        .borders(Borders::ALL)
        .border_style(theme.muted());
    let inner = block.inner(form_area);
    frame.render_widget(Clear, form_area);
    frame.render_widget(block, form_area);

    let login = &app.login;
    let password = if login.show_password {
        login.password.clone()
    } else {
        "•".repeat(login.password.chars().count())
    };
    let field = |label: &'static str, value: String, focused: bool| {
        let marker = if focused { "▸ " } else { "  " };
        let style = if focused {
            theme.title()
        } else {
            Style::default().fg(theme.text)
        };
        Line::from(vec![
            Span::styled(marker, style),
            Span::styled(format!("{label:<10}"), theme.muted()),
            Span::styled(value, style),
        ])
    };

    let mut lines = vec![
        field("Email", login.email.clone(), login.focus == LoginField::Email),
        field("Password", password, login.focus == LoginField::Password),
        Line::default(),
    ];
    if login.pending {
        lines.push(Line::from(Span::styled("Signing in…", theme.muted())));
    } else if let Some(error) = &login.error {
        lines.push(Line::from(Span::styled(error.as_str(), error_style(theme))));
    } else {
        lines.push(Line::default());
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Enter: sign in  Ctrl-g: Google  Tab: next field",
        theme.muted(),
    )));
    lines.push(Line::from(Span::styled(
        "Ctrl-s: show/hide password  Esc: quit",
        theme.muted(),
    )));

    frame.render_widget(Paragraph::new(lines), inner);
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

fn error_style(theme: &Theme) -> Style {
    Style::default()
        .fg(ratatui::style::Color::Red)
        .bg(theme.background)
}

fn draw_banner(banner: &Banner, theme: &Theme, frame: &mut Frame, area: Rect) {
    let accent = match banner.kind {
        BannerKind::Success => theme.price(),
        BannerKind::Error => error_style(theme),
        BannerKind::Info => theme.title(),
    };
    let mut spans = vec![Span::styled(banner.message.as_str(), accent.add_modifier(Modifier::BOLD))];
    if let Some((title, price)) = &banner.product {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(title.as_str(), Style::default().fg(theme.text)));
        spans.push(Span::raw("  "));
        spans.push(Span::styled(price.as_str(), theme.price()));
    }

    let widget = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(accent)
            .title(Span::styled(" x: dismiss ", theme.muted())),
    );
    frame.render_widget(widget, area);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, theme: &Theme, frame: &mut Frame, area: Rect) {
    let help = match app.screen {
        Screen::Login => "",
        Screen::Products => {
            "  q: quit  ↑/↓: scroll  Enter: open  r: refresh  c: category  t: theme"
        }
        Screen::Detail(_) => "  Esc: back  t: theme  q: quit",
    };
    let user = app
        .session
        .as_ref()
        .map(|s| format!("  {}", s.email))
        .unwrap_or_default();

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(&app.status, Style::default().fg(theme.primary)),
        Span::raw("  "),
        Span::styled(
            format!("{} products", app.feed.products().len()),
            theme.price(),
        ),
        Span::styled(user, theme.muted()),
        Span::styled(help, theme.muted()),
    ]));
    frame.render_widget(status, area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
