use crate::api::{Character, CharacterPage};
use crate::query::QueryState;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use super::utils::{status_color, truncate};

pub fn draw_character_list(
  frame: &mut Frame,
  area: Rect,
  state: &QueryState<CharacterPage>,
  selected: usize,
  page: u32,
) {
  let title = if state.is_loading() {
    format!(" Characters [page {}] (loading...) ", page)
  } else if state.is_fetching() {
    format!(" Characters [page {}] (refreshing...) ", page)
  } else {
    let shown = state.data().map_or(0, |d| d.results.len());
    format!(" Characters [page {}] ({}) ", page, shown)
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if state.is_loading() {
    let paragraph = Paragraph::new("Loading...")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  // An error replaces the results entirely
  if let Some(error) = state.error() {
    let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error.message()))
      .block(block)
      .style(Style::default().fg(Color::Red))
      .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
    return;
  }

  let characters = state.data().map_or(&[][..], |d| d.results.as_slice());
  if characters.is_empty() {
    let paragraph = Paragraph::new("No characters on this page.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = characters
    .iter()
    .map(|character| {
      let line = Line::from(vec![
        Span::styled(
          format!("{:>4}", character.id),
          Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
          format!("{:<32}", truncate(&character.name, 32)),
          Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(
          character.summary(),
          Style::default().fg(status_color(&character.status)),
        ),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut list_state = ListState::default();
  list_state.select(Some(selected.min(characters.len() - 1)));

  frame.render_stateful_widget(list, area, &mut list_state);
}

/// Profile and image links for the selected character.
pub fn draw_character_detail(frame: &mut Frame, area: Rect, character: Option<&Character>) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let Some(character) = character else {
    frame.render_widget(block, area);
    return;
  };

  let label = Style::default().fg(Color::DarkGray);
  let mut origin = character.origin.clone();
  if !character.kind.is_empty() {
    origin = format!("{} ({})", origin, character.kind);
  }

  let lines = vec![
    Line::from(vec![
      Span::styled("Origin: ", label),
      Span::raw(origin),
      Span::styled("  Location: ", label),
      Span::raw(character.location.as_str()),
    ]),
    Line::from(vec![
      Span::styled("Profile: ", label),
      Span::raw(character.url.as_str()),
    ]),
    Line::from(vec![
      Span::styled("Image: ", label),
      Span::raw(character.image.as_str()),
    ]),
  ];

  let paragraph = Paragraph::new(lines).block(block);
  frame.render_widget(paragraph, area);
}
