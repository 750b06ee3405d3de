use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use ratatui_image::{picker::Picker, protocol::StatefulProtocol, Resize, StatefulImage};

use crate::app::{App, Focus};
use crate::backend::cover::CoverState;
use crate::ui::adapter::bookmark_label;

/// Terminal-side state that is not part of the application model.
pub struct Screen {
    picker: Option<Picker>,
    cover: Option<(u64, StatefulProtocol)>,
}

impl Screen {
    pub fn new() -> Self {
        Self {
            picker: Picker::from_query_stdio().ok(),
            cover: None,
        }
    }

    /// Rebuilds the image protocol when the cover chain has moved on.
    fn cover_protocol(&mut self, app: &App) -> Option<&mut StatefulProtocol> {
        let revision = app.cover.revision();
        let CoverState::Done(image) = app.cover.state() else {
            self.cover = None;
            return None;
        };
        let stale = self.cover.as_ref().is_none_or(|(rev, _)| *rev != revision);
        if stale {
            let picker = self.picker.as_ref()?;
            self.cover = Some((revision, picker.new_resize_protocol(image.clone())));
        }
        self.cover.as_mut().map(|(_, protocol)| protocol)
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

pub fn ui(f: &mut Frame, app: &mut App, screen: &mut Screen) {
    let area = f.area();

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // search box
            Constraint::Min(10),   // lists
            Constraint::Length(3), // status
            Constraint::Length(3), // footer
        ])
        .split(area);

    draw_search(f, root[0], app);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(40),
            Constraint::Percentage(25),
        ])
        .split(root[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[2]);

    let manga_items: Vec<ListItem> = app
        .manga_list
        .iter()
        .map(|m| ListItem::new(m.title.clone()))
        .collect();
    let title = if app.searching { "Manga (searching...)" } else { "Manga" };
    draw_list(
        f,
        left[0],
        title,
        manga_items,
        &mut app.manga_state,
        app.focus == Focus::Manga,
    );
    draw_manga_detail(f, left[1], app);

    let chapter_items: Vec<ListItem> = app
        .chapter_list
        .iter()
        .map(|c| ListItem::new(c.label()))
        .collect();
    let chapter_title = if app.selected.title.is_empty() {
        "Chapters".to_string()
    } else {
        format!("Chapters: {}", app.selected.title)
    };
    draw_list(
        f,
        columns[1],
        &chapter_title,
        chapter_items,
        &mut app.chapter_state,
        app.focus == Focus::Chapters,
    );

    let bookmark_items: Vec<ListItem> = app
        .bookmarks
        .iter()
        .map(|b| ListItem::new(bookmark_label(b)))
        .collect();
    draw_list(
        f,
        right[0],
        "Bookmarks",
        bookmark_items,
        &mut app.bookmark_state,
        app.focus == Focus::Bookmarks,
    );

    draw_cover(f, right[1], app, screen);
    draw_status(f, root[2], app);
    draw_footer(f, root[3]);

    if let Some(notice) = app.notice() {
        draw_modal(f, area, &notice.title, &notice.message, "Press any key");
    } else if let Some(bookmark) = &app.pending_delete {
        draw_modal(
            f,
            area,
            "Delete Bookmark",
            &format!("Delete bookmark for {}?", bookmark.title),
            "y: yes  n: no",
        );
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

fn draw_search(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Search;
    let mut spans = vec![Span::raw(app.search_query.as_str())];
    if focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    }
    let p = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Search")
            .border_style(focus_style(focused)),
    );
    f.render_widget(p, area);
}

fn draw_list(
    f: &mut Frame,
    area: Rect,
    title: &str,
    items: Vec<ListItem>,
    state: &mut ListState,
    focused: bool,
) {
    let empty = items.is_empty();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(focus_style(focused));

    if empty {
        let p = Paragraph::new("Nothing here yet")
            .block(block)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(p, area);
        return;
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    f.render_stateful_widget(list, area, state);
}

fn draw_manga_detail(f: &mut Frame, area: Rect, app: &App) {
    let text = app
        .highlighted_manga()
        .map(|m| m.detail())
        .unwrap_or_default();
    let p = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_cover(f: &mut Frame, area: Rect, app: &App, screen: &mut Screen) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Cover")
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if let Some(protocol) = screen.cover_protocol(app) {
        let image_widget = StatefulImage::new().resize(Resize::Scale(None));
        f.render_stateful_widget(image_widget, inner, protocol);
        return;
    }

    let caption = match app.cover.state() {
        // Terminal without graphics support.
        CoverState::Done(_) => "Cover loaded",
        state => state.caption(),
    };
    let p = Paragraph::new(caption)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(p, inner);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let p = Paragraph::new(app.status.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Status")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(p, area);
}

fn draw_footer(f: &mut Frame, area: Rect) {
    let text = Line::from(vec![
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(": switch pane  "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(": move  "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(": open  "),
        Span::styled("m", Style::default().fg(Color::Yellow)),
        Span::raw(": mark last read  "),
        Span::styled("d", Style::default().fg(Color::Yellow)),
        Span::raw(": delete bookmark  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(": quit"),
    ]);

    let p = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .alignment(Alignment::Center);
    f.render_widget(p, area);
}

fn draw_modal(f: &mut Frame, area: Rect, title: &str, message: &str, hint: &str) {
    let popup = centered_rect(area, 60, 7);
    f.render_widget(Clear, popup);

    let text = vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            hint.to_string(),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let p = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .border_style(
                    Style::default()
                        .fg(Color::Red)
                        .add_modifier(Modifier::BOLD),
                ),
        );
    f.render_widget(p, popup);
}

fn centered_rect(area: Rect, percent_x: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x.min(100)) / 100) as u16;
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modal_is_centered_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(area, 60, 7);
        assert_eq!(popup, Rect::new(20, 16, 60, 7));

        let tiny = centered_rect(Rect::new(0, 0, 10, 4), 60, 7);
        assert_eq!(tiny.height, 4);
        assert!(tiny.right() <= 10);
    }

    #[test]
    fn modal_fits_very_wide_terminals() {
        let area = Rect::new(0, 0, 2000, 50);
        let popup = centered_rect(area, 60, 7);
        assert_eq!(popup.width, 1200);
        assert_eq!(popup.x, 400);
    }
}
