use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::ui::styles;
use crate::utils::{excerpt, format_timestamp, truncate_string};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_article_list(frame, app, chunks[0]);
    render_preview(frame, app, chunks[1]);
}

fn render_article_list(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" Articles ({}) ", app.articles.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if let Some(ref error) = app.articles_error {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )))
        .block(block)
        .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
        return;
    }

    if app.articles.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            " No articles yet.",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    // Date column is fixed width; the title takes what's left
    let title_width = (area.width as usize).saturating_sub(2 + 16 + 2 + 14).max(10);

    let items: Vec<ListItem> = app
        .articles
        .iter()
        .enumerate()
        .map(|(i, article)| {
            let line = Line::from(vec![
                Span::styled(
                    format_timestamp(&article.created_at.with_timezone(&Local)),
                    styles::muted_style(),
                ),
                Span::raw("  "),
                Span::raw(format!(
                    "{:<width$}",
                    truncate_string(&article.title, title_width),
                    width = title_width
                )),
                Span::styled(
                    format!(" {}", truncate_string(&article.author.username, 12)),
                    styles::highlight_style(),
                ),
            ]);

            let style = if i == app.article_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };

            ListItem::new(line).style(style)
        })
        .collect();

    let list = List::new(items).block(block);

    let mut state = ListState::default();
    state.select(Some(app.article_selection));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_preview(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Preview ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let Some(article) = app.articles.get(app.article_selection) else {
        frame.render_widget(block, area);
        return;
    };

    let lines = vec![
        Line::from(Span::styled(article.title.clone(), styles::title_style())),
        Line::from(vec![
            Span::styled("by ", styles::muted_style()),
            Span::styled(article.author.username.clone(), styles::highlight_style()),
        ]),
        Line::from(""),
        Line::from(excerpt(&article.content, 200)),
        Line::from(""),
        Line::from(Span::styled("[Enter] Read article", styles::muted_style())),
    ];

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
