//! TUI module - terminal dashboard with ratatui
//!
//! Tabs for body parts, workout tips and the progress calendar. Remote lists
//! load through fetch hooks in the background; the calendar reads and writes
//! the local store directly.

mod calendar;

use anyhow::{Result, bail};
use chrono::{Days, Local, NaiveDate};
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};
use tracing::error;
use std::io::{Stdout, stdout};
use std::rc::Rc;
use std::time::Instant;

use crate::api::FitnessApi;
use crate::db::KeyValueStore;
use crate::exercises::{BodyPart, Exercise};
use crate::fetch::FetchHook;
use crate::progress::{CalendarMarkMap, ProgressTracker};
use crate::selection;
use crate::session::SessionContext;
use crate::tips::{Tip, TipExpansion, expand_label};

pub use calendar::{month_weeks, render_month, shift_month};

type Tui = Terminal<CrosstermBackend<Stdout>>;

const PROGRESS_WRITE_ALERT: &str = "Failed to update progress. Please try again.";

/// Why the dashboard closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    /// Local state is already cleared; the caller ends the remote session
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Home,
    Tips,
    Profile,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Home, Tab::Tips, Tab::Profile];

    fn title(&self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Tips => "Workout Tips",
            Tab::Profile => "Profile",
        }
    }

    fn index(&self) -> usize {
        Tab::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    fn next(&self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    fn prev(&self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

/// Exercise list of one body part
struct ExercisesScreen {
    body_part_name: FetchHook<Option<String>>,
    exercises: FetchHook<Vec<Exercise>>,
    cursor: usize,
    name_saved: bool,
}

struct DetailScreen {
    exercise: FetchHook<Option<Exercise>>,
}

enum Screen {
    Exercises(ExercisesScreen),
    Detail(DetailScreen),
}

/// Celebration currently on screen
struct Banner {
    until: Instant,
}

/// App state for TUI
pub struct App {
    api: FitnessApi,
    store: Rc<dyn KeyValueStore>,
    tracker: ProgressTracker,
    session: SessionContext,
    tab: Tab,
    body_parts: FetchHook<Vec<BodyPart>>,
    body_part_cursor: usize,
    /// Stored selection, applied to the cursor once body parts arrive
    pending_selection: Option<String>,
    tips: FetchHook<Vec<Tip>>,
    tip_cursor: usize,
    expansion: TipExpansion,
    marks: CalendarMarkMap,
    day_cursor: NaiveDate,
    banner: Option<Banner>,
    alert: Option<String>,
    stack: Vec<Screen>,
    exit: Option<Exit>,
}

impl App {
    pub fn new(api: FitnessApi, store: Rc<dyn KeyValueStore>, session: SessionContext) -> Result<Self> {
        let Some(user) = session.user() else {
            bail!("no signed-in user");
        };

        let tracker = ProgressTracker::new(store.clone());
        let marks = tracker.load_progress(&user.id);

        let list_api = api.clone();
        let body_parts = FetchHook::new(move || {
            let api = list_api.clone();
            async move { api.body_parts().await }
        });
        let tips_api = api.clone();
        let tips = FetchHook::new(move || {
            let api = tips_api.clone();
            async move { api.tips().await }
        });
        body_parts.spawn_initialize();
        tips.spawn_initialize();
        let pending_selection = selection::selected_body_part(store.as_ref());

        Ok(Self {
            api,
            store,
            tracker,
            session,
            tab: Tab::Home,
            body_parts,
            body_part_cursor: 0,
            pending_selection,
            tips,
            tip_cursor: 0,
            expansion: TipExpansion::default(),
            marks,
            day_cursor: Local::now().date_naive(),
            banner: None,
            alert: None,
            stack: Vec::new(),
            exit: None,
        })
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<Exit> {
        let mut terminal = init_terminal()?;

        let result = self.event_loop(&mut terminal);

        restore_terminal()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Tui) -> Result<Exit> {
        loop {
            if let Some(exit) = self.exit {
                return Ok(exit);
            }
            self.tick();
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }
    }

    /// Housekeeping between frames
    fn tick(&mut self) {
        if self.banner.as_ref().is_some_and(|b| Instant::now() >= b.until) {
            self.banner = None;
        }

        if self.pending_selection.is_some() {
            let parts = self.body_parts.data();
            if !parts.is_empty() {
                let id = self.pending_selection.take();
                if let Some(index) = parts.iter().position(|p| Some(&p.id) == id.as_ref()) {
                    self.body_part_cursor = index;
                }
            }
        }

        let Some(Screen::Exercises(screen)) = self.stack.last_mut() else {
            return;
        };
        if screen.name_saved {
            return;
        }
        if let Some(name) = screen.body_part_name.data() {
            if let Err(e) = selection::remember_body_part_name(self.store.as_ref(), &name) {
                error!(error = %e, "Failed to store selected body part name");
            }
            screen.name_saved = true;
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(area);

        // Header
        let titles: Vec<&str> = Tab::ALL.iter().map(Tab::title).collect();
        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .highlight_style(Style::default().fg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL).title("homefit"));
        frame.render_widget(tabs, chunks[0]);

        match self.stack.last() {
            Some(Screen::Exercises(screen)) => self.render_exercises(frame, chunks[1], screen),
            Some(Screen::Detail(screen)) => render_detail(frame, chunks[1], screen),
            None => match self.tab {
                Tab::Home => self.render_home(frame, chunks[1]),
                Tab::Tips => self.render_tips(frame, chunks[1]),
                Tab::Profile => self.render_profile(frame, chunks[1]),
            },
        }

        // Footer
        let (text, style) = match (&self.alert, self.screen_error()) {
            (Some(alert), _) => (alert.clone(), Style::default().fg(Color::Red)),
            (None, Some(error)) => (error, Style::default().fg(Color::Red)),
            (None, None) => (self.key_hints().to_string(), Style::default().fg(Color::DarkGray)),
        };
        let footer = Paragraph::new(text)
            .style(style)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[2]);
    }

    fn key_hints(&self) -> &'static str {
        match (self.stack.last(), self.tab) {
            (Some(Screen::Exercises(_)), _) => "q: quit | ↑↓: move | enter: details | r: refresh | esc: back",
            (Some(Screen::Detail(_)), _) => "q: quit | r: refresh | esc: back",
            (None, Tab::Home) => "q: quit | tab: switch | ↑↓: move | enter: exercises | r: refresh",
            (None, Tab::Tips) => "q: quit | tab: switch | ↑↓: move | enter: read more | r: refresh",
            (None, Tab::Profile) => "q: quit | tab: switch | ←→↑↓: day | [ ]: month | enter: toggle | t: today | L: log out",
        }
    }

    /// Failure of the fetch behind the visible screen
    fn screen_error(&self) -> Option<String> {
        match self.stack.last() {
            Some(Screen::Exercises(screen)) => screen.exercises.error(),
            Some(Screen::Detail(screen)) => screen.exercise.error(),
            None => match self.tab {
                Tab::Home => self.body_parts.error(),
                Tab::Tips => self.tips.error().map(|_| "Failed to fetch workout tips.".to_string()),
                Tab::Profile => None,
            },
        }
    }

    fn render_home(&self, frame: &mut Frame, area: Rect) {
        let username = self.session.user().map(|u| u.username.as_str()).unwrap_or_default();
        let title = format!("Welcome Back, {}! Select which muscle you want to workout today", username);
        let parts = self.body_parts.snapshot();
        let items: Vec<ListItem> = parts
            .data
            .iter()
            .map(|p| {
                ListItem::new(vec![
                    Line::from(p.name.clone()).style(Style::default().fg(Color::Red).bold()),
                    Line::from(p.description.clone()).style(Style::default().fg(Color::Gray)),
                ])
            })
            .collect();
        render_list(
            frame,
            area,
            &title,
            items,
            self.body_part_cursor,
            parts.loading,
            ("No Body Parts Found", "There are no exercises available at the moment."),
        );
    }

    fn render_exercises(&self, frame: &mut Frame, area: Rect, screen: &ExercisesScreen) {
        let name = screen
            .body_part_name
            .data()
            .unwrap_or_else(|| "Loading...".to_string());
        let title = format!("Selected Body Part: {}", name);
        let exercises = screen.exercises.snapshot();
        let items: Vec<ListItem> = exercises
            .data
            .iter()
            .map(|e| {
                ListItem::new(vec![
                    Line::from(e.name.clone()).style(Style::default().fg(Color::Cyan).bold()),
                    Line::from(e.description.clone()),
                ])
            })
            .collect();
        render_list(
            frame,
            area,
            &title,
            items,
            screen.cursor,
            exercises.loading,
            ("No Exercises Found", "There are no exercises available for this body part at the moment."),
        );
    }

    fn render_tips(&self, frame: &mut Frame, area: Rect) {
        let tips = self.tips.snapshot();
        let items: Vec<ListItem> = tips
            .data
            .iter()
            .enumerate()
            .map(|(i, tip)| {
                let expanded = self.expansion.is_expanded(i);
                ListItem::new(vec![
                    Line::from(tip.title.clone()).style(Style::default().fg(Color::Cyan).bold()),
                    Line::from(tip.body(expanded)),
                    Line::from(expand_label(expanded)).style(Style::default().fg(Color::Blue)),
                ])
            })
            .collect();
        render_list(
            frame,
            area,
            "Workout Tips: Enhance Your Growth",
            items,
            self.tip_cursor,
            tips.loading,
            ("No Tips Found", "Check back later for more workout tips!"),
        );
    }

    fn render_profile(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(9), Constraint::Length(3)])
            .split(area);

        let (username, avatar) = self
            .session
            .user()
            .map(|u| (u.username.clone(), u.avatar.clone().unwrap_or_default()))
            .unwrap_or_default();
        let profile = Paragraph::new(vec![
            Line::from(username).style(Style::default().bold()).centered(),
            Line::from(avatar).style(Style::default().fg(Color::DarkGray)).centered(),
        ])
        .block(Block::default().borders(Borders::ALL).title("Profile"));
        frame.render_widget(profile, chunks[0]);

        let today = Local::now().date_naive();
        let calendar = Paragraph::new(render_month(self.day_cursor, today, &self.marks))
            .block(Block::default().borders(Borders::ALL).title("View and update your progress here"));
        frame.render_widget(calendar, chunks[1]);

        let banner = match self.banner {
            Some(_) => Paragraph::new("Great Workout Today · You Are Stronger")
                .style(Style::default().fg(Color::Yellow).bg(Color::Red).bold())
                .centered(),
            None => Paragraph::new(format!("{} days completed", self.marks.marked_dates().len()))
                .style(Style::default().fg(Color::DarkGray))
                .centered(),
        };
        frame.render_widget(banner.block(Block::default().borders(Borders::ALL)), chunks[2]);
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    self.alert = None;
                    self.handle_key(key.code);
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) {
        if code == KeyCode::Char('q') {
            self.exit = Some(Exit::Quit);
            return;
        }

        if !self.stack.is_empty() {
            self.handle_screen_key(code);
            return;
        }

        match code {
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::BackTab => self.tab = self.tab.prev(),
            _ => match self.tab {
                Tab::Home => self.handle_home_key(code),
                Tab::Tips => self.handle_tips_key(code),
                Tab::Profile => self.handle_profile_key(code),
            },
        }
    }

    fn handle_home_key(&mut self, code: KeyCode) {
        let count = self.body_parts.data().len();
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.body_part_cursor = self.body_part_cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.body_part_cursor = step_down(self.body_part_cursor, count),
            KeyCode::Char('r') => {
                self.body_parts.spawn_refetch();
            }
            KeyCode::Enter => {
                if let Some(part) = self.body_parts.data().get(self.body_part_cursor) {
                    self.open_body_part(&part.id);
                }
            }
            _ => {}
        }
    }

    fn open_body_part(&mut self, body_part_id: &str) {
        // Name remembered for this body part, shown until the fetch settles
        let known_name = match selection::selected_body_part(self.store.as_ref()) {
            Some(previous) if previous == body_part_id => selection::selected_body_part_name(self.store.as_ref()),
            _ => None,
        };
        if let Err(e) = selection::remember_body_part(self.store.as_ref(), body_part_id) {
            error!(error = %e, "Failed to store selected body part");
            return;
        }

        let id = body_part_id.to_string();
        let name_api = self.api.clone();
        let name_id = id.clone();
        let body_part_name = FetchHook::with_initial(known_name, move || {
            let api = name_api.clone();
            let id = name_id.clone();
            async move { api.body_part(&id).await.map(|p| Some(p.name)) }
        });
        let list_api = self.api.clone();
        let exercises = FetchHook::new(move || {
            let api = list_api.clone();
            let id = id.clone();
            async move { api.exercises_for_body_part(&id).await }
        });
        body_part_name.spawn_initialize();
        exercises.spawn_initialize();

        self.stack.push(Screen::Exercises(ExercisesScreen {
            body_part_name,
            exercises,
            cursor: 0,
            name_saved: false,
        }));
    }

    fn handle_screen_key(&mut self, code: KeyCode) {
        if code == KeyCode::Esc || code == KeyCode::Backspace {
            self.stack.pop();
            return;
        }

        let mut open = None;
        match self.stack.last_mut() {
            Some(Screen::Exercises(screen)) => {
                let exercises = screen.exercises.data();
                match code {
                    KeyCode::Up | KeyCode::Char('k') => screen.cursor = screen.cursor.saturating_sub(1),
                    KeyCode::Down | KeyCode::Char('j') => screen.cursor = step_down(screen.cursor, exercises.len()),
                    KeyCode::Char('r') => {
                        screen.exercises.spawn_refetch();
                    }
                    KeyCode::Enter => open = exercises.get(screen.cursor).map(|e| e.id.clone()),
                    _ => {}
                }
            }
            Some(Screen::Detail(screen)) => {
                if code == KeyCode::Char('r') {
                    screen.exercise.spawn_refetch();
                }
            }
            None => {}
        }

        if let Some(exercise_id) = open {
            let api = self.api.clone();
            let exercise = FetchHook::new(move || {
                let api = api.clone();
                let id = exercise_id.clone();
                async move { api.exercise(&id).await.map(Some) }
            });
            exercise.spawn_initialize();
            self.stack.push(Screen::Detail(DetailScreen { exercise }));
        }
    }

    fn handle_tips_key(&mut self, code: KeyCode) {
        let count = self.tips.data().len();
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.tip_cursor = self.tip_cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.tip_cursor = step_down(self.tip_cursor, count),
            KeyCode::Enter | KeyCode::Char(' ') if count > 0 => self.expansion.toggle(self.tip_cursor),
            KeyCode::Char('r') => {
                self.tips.spawn_refetch();
            }
            _ => {}
        }
    }

    fn handle_profile_key(&mut self, code: KeyCode) {
        let cursor = self.day_cursor;
        match code {
            KeyCode::Left | KeyCode::Char('h') => self.day_cursor = cursor.pred_opt().unwrap_or(cursor),
            KeyCode::Right | KeyCode::Char('l') => self.day_cursor = cursor.succ_opt().unwrap_or(cursor),
            KeyCode::Up | KeyCode::Char('k') => {
                self.day_cursor = cursor.checked_sub_days(Days::new(7)).unwrap_or(cursor)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.day_cursor = cursor.checked_add_days(Days::new(7)).unwrap_or(cursor)
            }
            KeyCode::Char('[') => self.day_cursor = shift_month(cursor, false),
            KeyCode::Char(']') => self.day_cursor = shift_month(cursor, true),
            KeyCode::Char('t') => self.day_cursor = Local::now().date_naive(),
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_day(),
            KeyCode::Char('L') => self.sign_out(),
            _ => {}
        }
    }

    fn toggle_day(&mut self) {
        let Some(user) = self.session.user() else { return };
        match self.tracker.toggle_date(&user.id, self.day_cursor, &mut self.marks) {
            Ok(outcome) => {
                if let Some(celebration) = outcome.celebration {
                    self.banner = Some(Banner {
                        until: Instant::now() + celebration.duration,
                    });
                }
            }
            Err(_) => self.alert = Some(PROGRESS_WRITE_ALERT.to_string()),
        }
    }

    fn sign_out(&mut self) {
        match self.session.end(self.store.as_ref()) {
            Ok(()) => {
                self.marks = CalendarMarkMap::new();
                self.exit = Some(Exit::SignedOut);
            }
            Err(e) => {
                error!(error = %e, "Error logging out");
                self.alert = Some(format!("Failed to log out: {}", e));
            }
        }
    }
}

fn render_detail(frame: &mut Frame, area: Rect, screen: &DetailScreen) {
    let block = Block::default().borders(Borders::ALL).title("Exercise");
    let state = screen.exercise.snapshot();
    let paragraph = match state.data {
        Some(exercise) => Paragraph::new(vec![
            Line::from(exercise.name).style(Style::default().fg(Color::Cyan).bold()),
            Line::from(""),
            Line::from(exercise.description),
            Line::from(""),
            Line::from(exercise.thumbnail.unwrap_or_default()).style(Style::default().fg(Color::DarkGray)),
        ]),
        None if state.loading => Paragraph::new("Loading..."),
        None => Paragraph::new("Exercise not available."),
    };
    frame.render_widget(paragraph.wrap(Wrap { trim: true }).block(block), area);
}

/// List with selection, empty state and a loading footer
fn render_list(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    items: Vec<ListItem>,
    cursor: usize,
    loading: bool,
    empty: (&str, &str),
) {
    let title = if loading {
        format!("{} (Loading...)", title)
    } else {
        title.to_string()
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if items.is_empty() {
        let (headline, subtitle) = empty;
        let text = if loading {
            vec![Line::from("Loading...")]
        } else {
            vec![
                Line::from(headline.to_string()).style(Style::default().bold()),
                Line::from(subtitle.to_string()),
            ]
        };
        frame.render_widget(Paragraph::new(text).centered().block(block), area);
        return;
    }

    let mut state = ListState::default().with_selected(Some(cursor.min(items.len() - 1)));
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn step_down(cursor: usize, count: usize) -> usize {
    if count == 0 { 0 } else { (cursor + 1).min(count - 1) }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Collections;
    use crate::db::MemoryStore;
    use crate::error::StoreError;
    use crate::progress::{CELEBRATION_DURATION, parse_date, progress_key};
    use crate::remote::Document;
    use crate::remote::memory::MemoryDocumentStore;
    use crate::selection::{SELECTED_BODY_PART_KEY, SELECTED_BODY_PART_NAME_KEY};
    use crate::session::User;
    use serde_json::json;
    use std::sync::Arc;

    const DB: &str = "db";

    fn api() -> FitnessApi {
        let remote = Arc::new(MemoryDocumentStore::new());
        remote.insert(DB, "body_parts", Document::new("chest", json!({
            "name": "Chest",
            "exercise": [{ "$id": "pushup" }]
        })));
        remote.insert(DB, "body_parts", Document::new("legs", json!({ "name": "Legs" })));
        remote.insert(DB, "exercises", Document::new("pushup", json!({ "name": "Push-up" })));
        FitnessApi::new(remote, DB, Collections::default())
    }

    fn session() -> SessionContext {
        SessionContext::begin(User {
            id: "u1".to_string(),
            account_id: "acc-1".to_string(),
            email: "sam@example.com".to_string(),
            username: "sam".to_string(),
            avatar: None,
        })
    }

    fn profile_app(store: Rc<dyn KeyValueStore>) -> App {
        let mut app = App::new(api(), store, session()).unwrap();
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.tab, Tab::Profile);
        app.day_cursor = parse_date("2024-05-01").unwrap();
        app
    }

    /// Store whose writes always fail
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.get(key)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
        fn all_keys(&self) -> Result<Vec<String>, StoreError> {
            self.0.all_keys()
        }
        fn clear(&self) -> Result<(), StoreError> {
            Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery))
        }
    }

    #[tokio::test]
    async fn test_marking_a_day_shows_banner_until_it_expires() {
        let store = Rc::new(MemoryStore::new());
        let mut app = profile_app(store.clone());
        let day = app.day_cursor;

        app.handle_key(KeyCode::Enter);

        assert!(app.marks.is_marked(&day));
        assert!(store.get(&progress_key("u1", day)).unwrap().is_some());
        let banner = app.banner.as_ref().expect("banner after completing a day");
        assert!(banner.until <= Instant::now() + CELEBRATION_DURATION);

        app.tick();
        assert!(app.banner.is_some());

        app.banner = Some(Banner { until: Instant::now() });
        app.tick();
        assert!(app.banner.is_none());
    }

    #[tokio::test]
    async fn test_unmarking_a_day_shows_no_banner() {
        let store = Rc::new(MemoryStore::new());
        let mut app = profile_app(store.clone());
        let day = app.day_cursor;

        app.handle_key(KeyCode::Enter);
        app.banner = None;
        app.handle_key(KeyCode::Char(' '));

        assert!(!app.marks.is_marked(&day));
        assert!(app.banner.is_none());
        assert_eq!(store.get(&progress_key("u1", day)).unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_write_shows_alert_and_keeps_calendar() {
        let mut app = profile_app(Rc::new(ReadOnlyStore(MemoryStore::new())));
        let day = app.day_cursor;

        app.handle_key(KeyCode::Enter);

        assert_eq!(app.alert.as_deref(), Some(PROGRESS_WRITE_ALERT));
        assert!(!app.marks.contains(&day));
        assert!(app.banner.is_none());
        assert_eq!(app.exit, None);
    }

    #[tokio::test]
    async fn test_sign_out_clears_store_and_exits() {
        let store = Rc::new(MemoryStore::new());
        store.set(SELECTED_BODY_PART_KEY, "chest").unwrap();
        let mut app = profile_app(store.clone());
        app.handle_key(KeyCode::Enter);

        app.handle_key(KeyCode::Char('L'));

        assert_eq!(app.exit, Some(Exit::SignedOut));
        assert!(!app.session.is_logged_in());
        assert!(app.marks.is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_sign_out_stays_signed_in() {
        let mut app = profile_app(Rc::new(ReadOnlyStore(MemoryStore::new())));

        app.handle_key(KeyCode::Char('L'));

        assert_eq!(app.exit, None);
        assert!(app.session.is_logged_in());
        assert!(app.alert.is_some());
    }

    #[tokio::test]
    async fn test_opening_body_part_remembers_selection() {
        let store = Rc::new(MemoryStore::new());
        let mut app = App::new(api(), store.clone(), session()).unwrap();
        app.body_parts.refetch().await;

        app.handle_key(KeyCode::Enter);

        assert_eq!(store.get(SELECTED_BODY_PART_KEY).unwrap().as_deref(), Some("chest"));
        let hook = match app.stack.last() {
            Some(Screen::Exercises(screen)) => screen.body_part_name.clone(),
            _ => panic!("exercises screen not opened"),
        };
        hook.refetch().await;
        app.tick();
        assert_eq!(store.get(SELECTED_BODY_PART_NAME_KEY).unwrap().as_deref(), Some("Chest"));

        app.handle_key(KeyCode::Esc);
        assert!(app.stack.is_empty());
    }

    #[tokio::test]
    async fn test_stored_selection_restores_cursor() {
        let store = Rc::new(MemoryStore::new());
        store.set(SELECTED_BODY_PART_KEY, "legs").unwrap();
        let mut app = App::new(api(), store.clone(), session()).unwrap();
        assert_eq!(app.body_part_cursor, 0);

        app.body_parts.refetch().await;
        app.tick();

        assert_eq!(app.body_part_cursor, 1);
        assert_eq!(app.pending_selection, None);
    }

    #[tokio::test]
    async fn test_reopening_body_part_shows_remembered_name() {
        let store = Rc::new(MemoryStore::new());
        store.set(SELECTED_BODY_PART_KEY, "chest").unwrap();
        store.set(SELECTED_BODY_PART_NAME_KEY, "Chest").unwrap();
        let mut app = App::new(api(), store.clone(), session()).unwrap();

        app.open_body_part("chest");

        match app.stack.last() {
            Some(Screen::Exercises(screen)) => {
                assert_eq!(screen.body_part_name.data().as_deref(), Some("Chest"))
            }
            _ => panic!("exercises screen not opened"),
        }
    }

    #[test]
    fn test_tab_cycle() {
        assert_eq!(Tab::Home.next(), Tab::Tips);
        assert_eq!(Tab::Profile.next(), Tab::Home);
        assert_eq!(Tab::Home.prev(), Tab::Profile);
    }

    #[test]
    fn test_step_down_clamps() {
        assert_eq!(step_down(0, 0), 0);
        assert_eq!(step_down(0, 3), 1);
        assert_eq!(step_down(2, 3), 2);
    }
}
