use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, EditorFocus, EditorMode};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title field
            Constraint::Min(5),    // Body
            Constraint::Length(3), // Save button / error
        ])
        .split(area);

    let heading = match app.editor_mode {
        EditorMode::New => " New article: Title ",
        EditorMode::Edit(_) => " Edit article: Title ",
    };

    let title_focused = app.editor_focus == EditorFocus::Title;
    let cursor = if title_focused { "▌" } else { "" };
    let title = Paragraph::new(Line::from(Span::styled(
        format!("{}{}", app.editor_title, cursor),
        styles::field_style(title_focused),
    )))
    .block(
        Block::default()
            .title(heading)
            .title_style(styles::title_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(title_focused)),
    );
    frame.render_widget(title, chunks[0]);

    let content_focused = app.editor_focus == EditorFocus::Content;
    let mut body_lines: Vec<Line> = app
        .editor_content
        .split('\n')
        .map(|l| Line::from(l.to_string()))
        .collect();
    if content_focused {
        if let Some(last) = body_lines.last_mut() {
            last.spans.push(Span::raw("▌"));
        }
    }
    let body = Paragraph::new(body_lines)
        .block(
            Block::default()
                .title(" Content ")
                .title_style(styles::title_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(content_focused)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(body, chunks[1]);

    let button_focused = app.editor_focus == EditorFocus::Button;
    let mut footer = vec![if button_focused {
        Span::styled(" [ ▶ Save ◀ ] ", styles::selected_style())
    } else {
        Span::styled(" [   Save   ] ", styles::list_item_style())
    }];
    match app.editor_error {
        Some(ref error) => footer.push(Span::styled(format!("  {}", error), styles::error_style())),
        None => footer.push(Span::styled(
            "  [Tab] next field  [Ctrl+S] save  [Esc] cancel",
            styles::muted_style(),
        )),
    }
    let footer = Paragraph::new(Line::from(footer)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border_style(button_focused)),
    );
    frame.render_widget(footer, chunks[2]);
}
