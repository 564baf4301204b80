use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};

use crate::app::App;
use crate::conversation::{Role, Turn};

const SEND_WIDTH: u16 = 14;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input row, footer
    let [header_area, chat_area, input_row, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    let [input_area, send_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(SEND_WIDTH),
    ])
    .areas(input_row);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_send(app, frame, send_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Support Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn turn_lines(turn: &Turn) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match turn.role {
        Role::User => {
            lines.push(
                Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Right),
            );
            for line in turn.content.split('\n') {
                lines.push(
                    Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Magenta)))
                        .alignment(Alignment::Right),
                );
            }
        }
        Role::Assistant => {
            lines.push(Line::from(Span::styled(
                "Assistant:",
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            )));
            for line in turn.content.split('\n') {
                lines.push(Line::from(line.to_string()));
            }
        }
    }
    lines.push(Line::default());
    lines
}

/// The conversation as a wrapped paragraph, without its border.
///
/// Scroll math counts rows on this same widget so the bottom it computes
/// is the bottom ratatui draws.
pub fn chat_paragraph(app: &App) -> Paragraph<'static> {
    let turns = app.session.conversation().turns();
    let mut lines: Vec<Line<'static>> = Vec::new();
    for (i, turn) in turns.iter().enumerate() {
        let is_open = i + 1 == turns.len();
        if is_open && app.is_thinking() {
            lines.push(Line::from(Span::styled(
                "Assistant:",
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
            lines.push(Line::default());
        } else {
            lines.extend(turn_lines(turn));
        }
    }

    Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false })
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if app.follow_tail {
        app.scroll_to_bottom();
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Conversation ");

    let chat = chat_paragraph(app)
        .block(chat_block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);

    let total = app.total_chat_lines();
    if total > app.chat_height {
        let overflow = total.saturating_sub(app.chat_height) as usize;
        let mut scrollbar_state = ScrollbarState::new(overflow).position(app.chat_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let sending = app.is_sending();
    let border_color = if sending { Color::DarkGray } else { Color::Yellow };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ");

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    // Line breaks are shown as a single glyph so the cursor stays on one row
    let visible_text: String = app
        .input
        .chars()
        .map(|c| if c == '\n' { '↵' } else { c })
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_style = if sending {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Magenta)
    };
    let input = Paragraph::new(visible_text).style(text_style).block(input_block);
    frame.render_widget(input, area);

    // No interior to place a cursor in on very narrow terminals
    if !sending && inner_width > 0 {
        let cursor_x = (cursor_pos - scroll_offset).min(inner_width - 1) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_send(app: &App, frame: &mut Frame, area: Rect) {
    let (label, style) = if app.is_sending() {
        ("Sending...", Style::default().fg(Color::DarkGray))
    } else {
        ("Send", Style::default().fg(Color::White).bg(Color::Blue).bold())
    };

    let button = Paragraph::new(label)
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(button, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mode = if app.is_sending() {
        Span::styled(" SENDING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        Span::styled(" READY ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let mut hints = vec![
        mode,
        Span::raw(" "),
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" Shift+Enter ", key_style),
        Span::styled(" newline ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ];
    if !app.follow_tail {
        hints.push(Span::styled(" (scrolled) ", Style::default().fg(Color::DarkGray)));
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::GREETING;
    use crate::session::StreamUpdate;
    use crate::stream::testing::ScriptedBackend;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::with_backend(
            GREETING,
            "http://localhost:3000/api/chat".to_string(),
            Arc::new(ScriptedBackend::chunks(&[])),
            tx,
        )
    }

    #[test]
    fn idle_screen_shows_greeting_and_send() {
        let mut app = app();
        let text = screen(&mut app);
        assert!(text.contains("Hi! I'm the support assistant."));
        assert!(text.contains("Send"));
        assert!(!text.contains("Sending..."));
        assert!(app.chat_area.is_some());
    }

    #[tokio::test]
    async fn sending_screen_shows_placeholder() {
        let mut app = app();
        app.input = "Hello".to_string();
        app.submit();

        let text = screen(&mut app);
        assert!(text.contains("You:"));
        assert!(text.contains("Hello"));
        assert!(text.contains("Thinking."));
        assert!(text.contains("Sending..."));
    }

    #[tokio::test]
    async fn word_wrapped_reply_tail_stays_on_screen() {
        for width in 20..=60u16 {
            for word_len in 3..=15usize {
                let mut app = app();
                app.input = "Hello".to_string();
                app.submit();

                let mut reply = format!("{} ", "x".repeat(word_len)).repeat(25);
                reply.push_str("ENDMARK");
                app.apply_stream(StreamUpdate::Chunk(reply));

                let mut terminal = Terminal::new(TestBackend::new(width, 12)).unwrap();
                terminal.draw(|frame| render(&mut app, frame)).unwrap();
                let text: String = terminal
                    .backend()
                    .buffer()
                    .content()
                    .iter()
                    .map(|cell| cell.symbol())
                    .collect();
                assert!(
                    text.contains("ENDMARK"),
                    "tail hidden at width {width}, word length {word_len}"
                );
            }
        }
    }

    #[test]
    fn cursor_stays_inside_input_on_narrow_terminals() {
        for width in 10..=24u16 {
            let mut app = app();
            app.input = "a fairly long message being typed".to_string();
            app.cursor_end();

            let mut terminal = Terminal::new(TestBackend::new(width, 12)).unwrap();
            terminal.draw(|frame| render(&mut app, frame)).unwrap();
            let cursor = terminal.get_cursor_position().unwrap();
            assert!(
                cursor.x < width.saturating_sub(SEND_WIDTH).max(1),
                "cursor at {} outside input at width {width}",
                cursor.x
            );
        }
    }
}
