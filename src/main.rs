use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use rmpager::{app, config, logging};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rmpager")]
#[command(about = "Page through the Rick and Morty character listing")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./rmpager.yaml or $XDG_CONFIG_HOME/rmpager/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Page to start on
  #[arg(short, long, default_value_t = 1)]
  page: u32,

  /// Override the API base URL
  #[arg(long)]
  base_url: Option<String>,

  /// Print the page to stdout instead of starting the UI
  #[arg(long)]
  print: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override base URL if specified on command line
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }

  let _log_guard = logging::init(&config)?;

  let mut app = app::App::new(&config, args.page)?;
  if args.print {
    print_page(&mut app).await
  } else {
    app.run().await
  }
}

/// Fetch the starting page once and print it.
async fn print_page(app: &mut app::App) -> Result<()> {
  let page_number = app.page();
  app.observe_current_page();
  let state = app.settle().await;

  if let Some(error) = state.error() {
    return Err(eyre!("{}", error.message()));
  }

  let Some(page) = state.data() else {
    return Err(eyre!("No data for page {}", page_number));
  };

  for character in &page.results {
    println!("{:>4}  {:<32}  {}", character.id, character.name, character.summary());
  }
  println!("Page {} of {} ({} characters)", page_number, page.info.pages, page.info.count);
  Ok(())
}
