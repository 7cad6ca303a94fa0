use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub mod commands;
pub mod config;
pub mod cover;
pub mod db;
pub mod error;
pub mod form;
pub mod formatter;
pub mod ids;
pub mod models;
pub mod store;

use config::Settings;
use models::NewBook;

/// Personal bookshelf catalog
#[derive(Parser, Debug)]
#[command(name = "bookshelf")]
#[command(version, about = "Personal bookshelf catalog with inline covers")]
pub struct Cli {
  /// Directory holding bookshelf.db
  #[arg(long, global = true)]
  pub data_dir: Option<PathBuf>,

  /// Storage slot the shelf lives in
  #[arg(long, global = true)]
  pub slot: Option<String>,

  /// Longest cover side in pixels after normalization
  #[arg(long, global = true)]
  pub max_dimension: Option<u32>,

  /// JPEG quality for normalized covers (1-100)
  #[arg(long, global = true)]
  pub quality: Option<u8>,

  /// Give up decoding a cover after this many seconds
  #[arg(long, global = true)]
  pub decode_timeout_secs: Option<u64>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Show every book on the shelf
  List {
    #[arg(long)]
    json: bool,
  },
  /// Show one book in detail
  Show {
    id: i64,
    #[arg(long)]
    json: bool,
  },
  /// Add a book with a cover image
  Add {
    #[arg(long)]
    title: String,
    /// Cover image file; normalized and stored inline
    #[arg(long)]
    cover: PathBuf,
    #[arg(long, default_value = "")]
    author: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Who recommended the book
    #[arg(long, default_value = "")]
    recommender: String,
  },
  /// Delete a book by id
  Remove { id: i64 },
  /// Print the data URI a cover file normalizes to
  Normalize { file: PathBuf },
  /// Write a book's stored cover to a file or directory
  ExportCover { id: i64, target: PathBuf },
}

impl Cli {
  pub fn settings(&self) -> Result<Settings, String> {
    self.settings_with(|key| std::env::var(key).ok(), Settings::default_data_dir())
  }

  /// Flags win over `BOOKSHELF_*` values from `lookup`, which win over defaults.
  pub fn settings_with(
    &self,
    lookup: impl Fn(&str) -> Option<String>,
    default_data_dir: Option<PathBuf>,
  ) -> Result<Settings, String> {
    let default_data_dir = self.data_dir.clone().or(default_data_dir);
    let mut settings =
      Settings::from_lookup(lookup, default_data_dir).map_err(|err| err.to_string())?;
    if let Some(dir) = &self.data_dir {
      settings.data_dir = dir.clone();
    }
    if let Some(slot) = &self.slot {
      settings.slot = slot.clone();
    }
    if let Some(max) = self.max_dimension {
      settings.normalize.max_dimension = max;
    }
    if let Some(quality) = self.quality {
      settings.normalize.quality = quality;
    }
    if let Some(secs) = self.decode_timeout_secs {
      settings.normalize.timeout = Duration::from_secs(secs);
    }
    settings.validate().map_err(|err| err.to_string())?;
    Ok(settings)
  }
}

fn init_logging() {
  let default_level = if cfg!(debug_assertions) { "info" } else { "warn" };
  let filter = EnvFilter::try_from_env("BOOKSHELF_LOG")
    .or_else(|_| EnvFilter::try_from_default_env())
    .unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

pub fn execute(cli: Cli) -> Result<String, String> {
  let settings = cli.settings()?;
  log::info!(
    "using data dir {} slot {}",
    settings.data_dir.display(),
    settings.slot
  );

  match cli.command {
    Command::Normalize { file } => {
      let encoded = commands::normalize_cover(&file, settings.normalize)?;
      Ok(encoded.data_uri)
    }
    Command::List { json } => {
      let shelf = commands::open_shelf(&settings)?;
      let books = commands::list_books(&shelf);
      if json {
        formatter::to_json(&books)
      } else {
        Ok(formatter::format_shelf(&books))
      }
    }
    Command::Show { id, json } => {
      let shelf = commands::open_shelf(&settings)?;
      let details = commands::get_book_details(&shelf, id)?;
      if json {
        formatter::to_json(&details)
      } else {
        Ok(formatter::format_details(&details))
      }
    }
    Command::Add {
      title,
      cover,
      author,
      description,
      recommender,
    } => {
      let mut shelf = commands::open_shelf(&settings)?;
      let fields = NewBook {
        title,
        author,
        description,
        recommender,
        image: String::new(),
      };
      let record = commands::add_book(&mut shelf, fields, Some(&cover), settings.normalize)?;
      Ok(format!("Added \"{}\" (id {})", record.title, record.id))
    }
    Command::Remove { id } => {
      let mut shelf = commands::open_shelf(&settings)?;
      match commands::remove_book(&mut shelf, id)? {
        Some(book) => Ok(format!("Removed \"{}\" (id {})", book.title, book.id)),
        None => Ok(format!("No book with id {}, nothing removed", id)),
      }
    }
    Command::ExportCover { id, target } => {
      let shelf = commands::open_shelf(&settings)?;
      let path = commands::export_cover(&shelf, id, &target)?;
      Ok(format!("Cover written to {}", path.display()))
    }
  }
}

pub fn run() {
  init_logging();
  let cli = Cli::parse();

  match execute(cli) {
    Ok(output) => println!("{}", output),
    Err(message) => {
      log::error!("{}", message);
      eprintln!("Error: {}", message);
      std::process::exit(1);
    }
  }
}
