use chrono::Local;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use blogdeck_core::auth::SessionStatus;

use crate::app::App;
use crate::ui::styles;
use crate::utils::format_timestamp;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(article) = app.current_article.as_ref() else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border_style(false));
        frame.render_widget(block, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(article.title.clone(), styles::title_style())),
        Line::from(vec![
            Span::styled("by ", styles::muted_style()),
            Span::styled(article.author.username.clone(), styles::highlight_style()),
            Span::styled(
                format!("  ·  {}", format_timestamp(&article.created_at.with_timezone(&Local))),
                styles::muted_style(),
            ),
        ]),
        Line::from(""),
    ];

    for body_line in article.content.lines() {
        lines.push(Line::from(body_line.to_string()));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Comments ({})", article.comment_count()),
        styles::highlight_style(),
    )));

    if article.comments.is_empty() {
        lines.push(Line::from(Span::styled("  No comments yet.", styles::muted_style())));
    }
    for comment in &article.comments {
        lines.push(Line::from(vec![
            Span::styled(format!("  {}", comment.author.username), styles::success_style()),
            Span::styled(
                format!(" - {}", format_timestamp(&comment.created_at.with_timezone(&Local))),
                styles::muted_style(),
            ),
        ]));
        for comment_line in comment.content.lines() {
            lines.push(Line::from(format!("    {}", comment_line)));
        }
    }

    lines.push(Line::from(""));
    match app.session_status() {
        SessionStatus::Authenticated => {
            lines.push(Line::from(Span::styled("[c] Add a comment", styles::muted_style())));
        }
        SessionStatus::Anonymous => {
            lines.push(Line::from(Span::styled("Log in to comment.", styles::muted_style())));
        }
        SessionStatus::Loading => {}
    }

    let title = if app.can_modify_current_article() {
        " Article  [e]dit  [d]elete "
    } else {
        " Article "
    };

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.article_scroll, 0));
    frame.render_widget(paragraph, area);
}
