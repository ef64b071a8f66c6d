use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use blogdeck_core::auth::SessionStatus;

use crate::app::{App, AppState, LoginFocus, Page, SignUpFocus};

use super::pages::{article, editor, home};
use super::styles;

/// Width of the text inside form fields
const FIELD_WIDTH: usize = 24;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar / session header
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::SigningUp => render_signup_overlay(frame, app),
        AppState::Commenting => render_comment_overlay(frame, app),
        AppState::ConfirmingDelete => render_delete_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Quitting => {}
    }
}

/// Spans for the right side of the header, driven by the session status.
fn session_header_spans(app: &App) -> Vec<Span<'static>> {
    match app.session_status() {
        SessionStatus::Loading => vec![Span::styled("checking session…", styles::muted_style())],
        SessionStatus::Authenticated => {
            let username = app.identity().map(|u| u.username).unwrap_or_default();
            vec![
                Span::styled("Welcome, ", styles::muted_style()),
                Span::styled(username, styles::highlight_style()),
                Span::styled("  [n]ew post  [L]ogout", styles::muted_style()),
            ]
        }
        SessionStatus::Anonymous => {
            vec![Span::styled("[l]ogin  [s]ign up", styles::muted_style())]
        }
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  blogdeck";
    let mut right = session_header_spans(app);
    right.push(Span::styled("  [?] Help", styles::muted_style()));

    let right_len: usize = right.iter().map(|s| s.content.chars().count()).sum();
    let padding = (area.width as usize).saturating_sub(title.len() + right_len + 2);

    let mut spans = vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(padding)),
    ];
    spans.extend(right);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.page {
        Page::Home => home::render(frame, app, area),
        Page::Article => article::render(frame, app, area),
        Page::Editor => editor::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.page {
        Page::Home => "[Enter] open | [r]efresh | [q]uit",
        Page::Article => "[Esc] back | [r]eload | [q]uit",
        Page::Editor => "[Ctrl+S] save | [Esc] cancel",
    };

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" {} ", app.config.api_base_url),
    };
    let right_text = format!(" {} ", shortcuts);

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 24, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  blogdeck", styles::title_style())),
        Line::from(Span::styled(format!("  version {}", version), styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("↑/↓", "Select article / scroll"),
        help_line("Enter", "Open article"),
        help_line("Esc", "Go back"),
        help_line("r", "Refresh"),
        Line::from(""),
        Line::from(Span::styled(" Account", styles::highlight_style())),
        help_line("l", "Log in"),
        help_line("s", "Sign up"),
        help_line("L", "Log out"),
        Line::from(""),
        Line::from(Span::styled(" Writing", styles::highlight_style())),
        help_line("n", "New post"),
        help_line("e / d", "Edit / delete your article"),
        help_line("c", "Comment on article"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(help_text).block(block);

    frame.render_widget(paragraph, area);
}

/// A single labelled form field: `Label: [value▌]`
fn form_field(label: &str, value: &str, focused: bool) -> Line<'static> {
    let shown: String = {
        let count = value.chars().count();
        // Keep the tail visible while typing past the field width
        value.chars().skip(count.saturating_sub(FIELD_WIDTH)).collect()
    };
    let display = format!("{:<width$}", shown, width = FIELD_WIDTH);
    let cursor = if focused { "▌" } else { " " };
    Line::from(vec![
        Span::styled(format!("  {:>9}: [", label), styles::muted_style()),
        Span::styled(format!("{}{}", display, cursor), styles::field_style(focused)),
        Span::styled("]", styles::muted_style()),
    ])
}

fn masked(value: &str) -> String {
    "*".repeat(value.chars().count())
}

fn form_button(label: &str, focused: bool) -> Line<'static> {
    if focused {
        Line::from(vec![
            Span::raw("              ["),
            Span::styled(format!(" ▶ {} ◀ ", label), styles::selected_style()),
            Span::raw("]"),
        ])
    } else {
        Line::from(vec![
            Span::raw("              ["),
            Span::styled(format!("   {}   ", label), styles::list_item_style()),
            Span::raw("]"),
        ])
    }
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 11 } else { 9 };
    let area = centered_rect_fixed(46, height, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(""),
        form_field("Email", &app.login_email, app.login_focus == LoginFocus::Email),
        form_field(
            "Password",
            &masked(&app.login_password),
            app.login_focus == LoginFocus::Password,
        ),
        Line::from(""),
        form_button("Login", app.login_focus == LoginFocus::Button),
    ];

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .title(" Log in ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn render_signup_overlay(frame: &mut Frame, app: &App) {
    let height = if app.signup_error.is_some() { 12 } else { 10 };
    let area = centered_rect_fixed(46, height, frame.area());

    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(""),
        form_field(
            "Username",
            &app.signup_username,
            app.signup_focus == SignUpFocus::Username,
        ),
        form_field("Email", &app.signup_email, app.signup_focus == SignUpFocus::Email),
        form_field(
            "Password",
            &masked(&app.signup_password),
            app.signup_focus == SignUpFocus::Password,
        ),
        Line::from(""),
        form_button("Sign up", app.signup_focus == SignUpFocus::Button),
    ];

    if let Some(ref error) = app.signup_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .title(" Sign up ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn render_comment_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(60, 9, frame.area());

    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(
            format!("{}▌", app.comment_input),
            styles::field_style(true),
        )),
        Line::from(""),
    ];
    match app.comment_error {
        Some(ref error) => lines.push(Line::from(Span::styled(error.clone(), styles::error_style()))),
        None => lines.push(Line::from(Span::styled(
            "[Enter] post  [Esc] cancel",
            styles::muted_style(),
        ))),
    }

    let block = Block::default()
        .title(" Add a comment ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_delete_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(46, 8, frame.area());

    frame.render_widget(Clear, area);

    let title = app
        .current_article
        .as_ref()
        .map(|a| crate::utils::truncate_string(&a.title, 36))
        .unwrap_or_default();

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("   Delete this article?", styles::highlight_style())),
        Line::from(Span::styled(format!("   {}", title), styles::list_item_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to delete, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block);

    frame.render_widget(paragraph, area);
}
