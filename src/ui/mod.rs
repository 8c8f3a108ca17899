mod characters;
mod utils;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Min(1),    // Character list
      Constraint::Length(5), // Selected character
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  let state = app.state();
  characters::draw_character_list(frame, chunks[0], state, app.selected(), app.page());

  let selected = state
    .data()
    .filter(|_| !state.is_loading() && !state.is_error())
    .and_then(|page| page.results.get(app.selected()));
  characters::draw_character_detail(frame, chunks[1], selected);

  draw_status_bar(frame, chunks[2], app);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let state = app.state();
  let info = state.data().map(|d| &d.info);

  let total = info
    .map(|i| i.total_pages().to_string())
    .unwrap_or_else(|| "?".to_string());
  let mut status = format!(" Page {} of {}", app.page(), total);

  if let Some(updated_at) = state.updated_at {
    let local = updated_at.with_timezone(&chrono::Local);
    status.push_str(&format!("  updated {}", local.format("%H:%M:%S")));
  }

  let mut hints = Vec::new();
  if info.is_some_and(|i| i.has_prev()) {
    hints.push("p:prev");
  }
  if info.is_some_and(|i| i.has_next()) {
    hints.push("n:next");
  }
  hints.extend(["j/k:nav", "r:refetch", "R:reload", "q:quit"]);

  let content = format!("{}  |  {}", status, hints.join("  "));
  let paragraph = Paragraph::new(content).style(Style::default().fg(Color::DarkGray));
  frame.render_widget(paragraph, area);
}
