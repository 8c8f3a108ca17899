use crate::api::{CharacterClient, CharacterPage};
use crate::cache::{CacheStore, QueryKey};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::pagination::Pagination;
use crate::query::{QueryCoordinator, QueryState};
use crate::ui;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Logical resource name used in cache keys
pub const CHARACTERS: &str = "characters";

/// Main application state
pub struct App {
  /// Query for the current page of characters
  query: QueryCoordinator<CharacterPage>,

  /// Current page
  pagination: Pagination,

  /// Selected row in the character list
  selected: usize,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, start_page: u32) -> Result<Self> {
    let client = CharacterClient::new(&config.api)?;
    let store = CacheStore::new(config.cache.policy());
    let policy = store.policy();
    info!(
      stale = ?policy.stale_time,
      expiry = ?policy.expiry_time,
      "page cache ready"
    );

    let query = QueryCoordinator::new(store, move |key: &QueryKey| {
      let client = client.clone();
      let page = key.page;
      async move { client.fetch_page(page).await }
    });

    Ok(Self::with_query(query, Pagination::starting_at(start_page)))
  }

  /// Build an app around an existing coordinator.
  pub fn with_query(query: QueryCoordinator<CharacterPage>, pagination: Pagination) -> Self {
    Self {
      query,
      pagination,
      selected: 0,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Cleanup terminal, even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(Duration::from_millis(250));

    // Initial data load
    self.observe_current_page();

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    info!(cached_pages = self.query.store().len(), "shutting down");
    self.query.store().clear();
    Ok(())
  }

  /// Observe the current page's key, fetching if needed.
  pub fn observe_current_page(&mut self) {
    let key = self.pagination.query_key(CHARACTERS);
    self.query.observe(key);
  }

  /// Wait for the current page's fetch to finish.
  pub async fn settle(&mut self) -> &QueryState<CharacterPage> {
    self.query.settle().await
  }

  pub fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        if self.query.poll() {
          self.clamp_selection();
        }
      }
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      KeyCode::Char('n') | KeyCode::Right => self.go_to_next_page(),
      KeyCode::Char('p') | KeyCode::Left => self.go_to_prev_page(),

      KeyCode::Char('j') | KeyCode::Down => {
        if self.selected + 1 < self.result_count() {
          self.selected += 1;
        }
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.selected = self.selected.saturating_sub(1);
      }

      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('R') => {
        self.query.invalidate();
      }
      _ => {}
    }
  }

  pub fn go_to_next_page(&mut self) {
    let info = self.query.state().data().map(|page| &page.info);
    if self.pagination.go_to_next_page(info) {
      self.selected = 0;
      self.observe_current_page();
    }
  }

  pub fn go_to_prev_page(&mut self) {
    let info = self.query.state().data().map(|page| &page.info);
    if self.pagination.go_to_prev_page(info) {
      self.selected = 0;
      self.observe_current_page();
    }
  }

  fn result_count(&self) -> usize {
    self.query.state().data().map_or(0, |page| page.results.len())
  }

  fn clamp_selection(&mut self) {
    self.selected = self.selected.min(self.result_count().saturating_sub(1));
  }

  // Accessors for UI

  pub fn state(&self) -> &QueryState<CharacterPage> {
    self.query.state()
  }

  pub fn page(&self) -> u32 {
    self.pagination.page()
  }

  pub fn selected(&self) -> usize {
    self.selected
  }

  pub fn should_quit(&self) -> bool {
    self.should_quit
  }
}
