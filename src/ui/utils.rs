use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the display color for a character's life status
pub fn status_color(status: &str) -> Color {
  match status {
    "Alive" => Color::Green,
    "Dead" => Color::Red,
    _ => Color::DarkGray,
  }
}
