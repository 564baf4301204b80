use std::sync::Arc;

use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::backend::{ChatBackend, HttpBackend};
use crate::config::Config;
use crate::session::{ChatSession, StreamUpdate};
use crate::stream::stream_reply;
use crate::tui::AppEvent;
use crate::ui;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub session: ChatSession,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat pane
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height, updated during render
    pub chat_width: u16,  // inner width, updated during render
    pub follow_tail: bool,
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub endpoint: String,
    backend: Arc<dyn ChatBackend>,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, events: UnboundedSender<AppEvent>) -> Self {
        let endpoint = config.endpoint();
        let backend = Arc::new(HttpBackend::new(&endpoint));
        Self::with_backend(config.greeting(), endpoint, backend, events)
    }

    pub fn with_backend(
        greeting: &str,
        endpoint: String,
        backend: Arc<dyn ChatBackend>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            session: ChatSession::new(greeting),

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,
            chat_area: None,

            animation_frame: 0,

            endpoint,
            backend,
            events,
        }
    }

    pub fn is_sending(&self) -> bool {
        self.session.is_in_flight()
    }

    /// True while the reply has been requested but nothing has arrived yet.
    pub fn is_thinking(&self) -> bool {
        self.is_sending() && self.session.conversation().last().content.is_empty()
    }

    /// Send the input buffer. Returns whether a request was started.
    pub fn submit(&mut self) -> bool {
        let Some(history) = self.session.begin_submit(&mut self.input) else {
            return false;
        };
        self.cursor = 0;
        self.animation_frame = 0;
        self.follow_tail = true;
        self.scroll_to_bottom();

        // Spawn background task that relays the reply back into the event loop
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            stream_reply(backend.as_ref(), history, move |update| {
                if events.send(AppEvent::Stream(update)).is_err() {
                    debug!("event loop gone, dropping stream update");
                }
            })
            .await;
        });
        true
    }

    pub fn apply_stream(&mut self, update: StreamUpdate) {
        self.session.apply(update);
        if self.follow_tail {
            self.scroll_to_bottom();
        }
    }

    // Input editing. The buffer is inert while a send is in flight.
    pub fn insert_char(&mut self, c: char) {
        if self.is_sending() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.is_sending() || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if self.is_sending() {
            return;
        }
        let char_count = self.input.chars().count();
        if self.cursor < char_count {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_thinking() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    pub fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };

        // Count rows with the widget's own word wrapping
        let rows = ui::chat_paragraph(self).line_count(wrap_width);
        rows.min(u16::MAX as usize) as u16
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.total_chat_lines().saturating_sub(visible_height)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
        self.follow_tail = self.chat_scroll >= max_scroll;
    }

    pub fn page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Role, Turn, GREETING};
    use crate::session::APOLOGY;
    use crate::stream::testing::{Script, ScriptedBackend};
    use tokio::sync::mpsc;

    fn app_with(backend: ScriptedBackend) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::with_backend(GREETING, "test://chat".to_string(), Arc::new(backend), tx);
        (app, rx)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    /// Feed stream updates back into the app until the send concludes.
    async fn drain(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<String> {
        let mut seen = Vec::new();
        while app.is_sending() {
            match rx.recv().await {
                Some(AppEvent::Stream(update)) => {
                    app.apply_stream(update);
                    seen.push(app.session.conversation().last().content.clone());
                }
                Some(_) => {}
                None => break,
            }
        }
        seen
    }

    #[test]
    fn line_total_follows_word_wrapping() {
        let (tx, _rx) = mpsc::unbounded_channel();
        // Two 7-letter words never share a 10-column row, so each takes its
        // own row even though 79 chars would fit in 8 rows cut mid-word.
        let greeting = "abcdefg ".repeat(10);
        let mut app = App::with_backend(
            greeting.trim_end(),
            String::new(),
            Arc::new(ScriptedBackend::chunks(&[])),
            tx,
        );
        app.chat_width = 10;
        // "Assistant:" row, one row per word, blank separator
        assert!(app.total_chat_lines() >= 1 + 10 + 1);
    }

    #[test]
    fn editing_is_utf8_safe() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::with_backend(
            GREETING,
            String::new(),
            Arc::new(ScriptedBackend::chunks(&[])),
            tx,
        );
        type_text(&mut app, "héllo");
        app.cursor_left();
        app.backspace();
        assert_eq!(app.input, "hélo");
        app.cursor_home();
        app.delete();
        assert_eq!(app.input, "élo");
        app.cursor_end();
        app.insert_char('!');
        assert_eq!(app.input, "élo!");
        assert_eq!(app.cursor, 4);
    }

    #[tokio::test]
    async fn submit_streams_reply_through_event_queue() {
        let (mut app, mut rx) =
            app_with(ScriptedBackend::chunks(&[&b"Hi"[..], &b" there"[..], &b"!"[..]]));
        type_text(&mut app, "Hello");

        assert!(app.submit());
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.is_thinking());

        let seen = drain(&mut app, &mut rx).await;
        assert_eq!(seen, vec!["Hi", "Hi there", "Hi there!", "Hi there!"]);

        let turns = app.session.conversation().turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1], Turn::user("Hello"));
        assert_eq!(turns[2], Turn::assistant("Hi there!"));
        assert!(!app.is_sending());
    }

    #[tokio::test]
    async fn input_is_inert_while_sending() {
        let (mut app, mut rx) = app_with(ScriptedBackend::chunks(&[&b"ok"[..]]));
        type_text(&mut app, "Hello");
        app.submit();

        type_text(&mut app, "Test");
        assert!(app.input.is_empty());
        app.input = "Test".to_string();
        assert!(!app.submit());
        assert_eq!(app.session.conversation().len(), 3);

        drain(&mut app, &mut rx).await;
        assert_eq!(app.input, "Test");
        assert!(app.submit());
    }

    #[tokio::test]
    async fn blank_submit_does_nothing() {
        let (mut app, _rx) = app_with(ScriptedBackend::chunks(&[]));
        type_text(&mut app, "   ");
        assert!(!app.submit());
        assert_eq!(app.input, "   ");
        assert_eq!(app.session.conversation().len(), 1);
        assert!(!app.is_sending());
    }

    #[tokio::test]
    async fn failure_shows_apology_and_unlocks_input() {
        let (mut app, mut rx) = app_with(ScriptedBackend::new(Script::Body(vec![
            Ok(b"Part1".to_vec()),
            Err(std::io::ErrorKind::UnexpectedEof),
        ])));
        type_text(&mut app, "X");
        app.submit();
        drain(&mut app, &mut rx).await;

        let last = app.session.conversation().last();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, APOLOGY);

        type_text(&mut app, "retry");
        assert_eq!(app.input, "retry");
    }

    #[test]
    fn manual_scroll_detaches_from_tail() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::with_backend(
            &"long greeting ".repeat(40),
            String::new(),
            Arc::new(ScriptedBackend::chunks(&[])),
            tx,
        );
        app.chat_width = 20;
        app.chat_height = 5;
        app.scroll_to_bottom();
        let bottom = app.chat_scroll;
        assert!(bottom > 0);

        app.scroll_up(3);
        assert_eq!(app.chat_scroll, bottom - 3);
        assert!(!app.follow_tail);

        app.scroll_down(100);
        assert_eq!(app.chat_scroll, bottom);
        assert!(app.follow_tail);
    }
}
