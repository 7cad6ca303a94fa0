use std::path::{Path, PathBuf};

use image::GenericImageView;

use crate::config::Settings;
use crate::cover::{self, EncodedImage, NormalizeOptions};
use crate::db::{SlotBackend, SqliteSlots};
use crate::form::BookForm;
use crate::ids::{ClockIds, IdGenerator};
use crate::models::{BookDetails, BookRecord, NewBook};
use crate::store::Bookshelf;

pub type LocalShelf = Bookshelf<SqliteSlots, ClockIds>;

pub fn open_shelf(settings: &Settings) -> Result<LocalShelf, String> {
  let slots = SqliteSlots::open_in(&settings.data_dir).map_err(|err| err.to_string())?;
  let mut shelf = Bookshelf::new(slots, ClockIds::new(), settings.slot.clone());
  shelf.load().map_err(|err| err.to_string())?;
  Ok(shelf)
}

pub fn list_books<S: SlotBackend, G: IdGenerator>(shelf: &Bookshelf<S, G>) -> Vec<BookRecord> {
  shelf.books().to_vec()
}

pub fn get_book_details<S: SlotBackend, G: IdGenerator>(
  shelf: &Bookshelf<S, G>,
  id: i64,
) -> Result<BookDetails, String> {
  let record = shelf
    .get(id)
    .cloned()
    .ok_or_else(|| format!("No book with id {}", id))?;
  let dimensions = match cover::decode_data_uri_image(&record.image) {
    Ok(img) => Some(img.dimensions()),
    Err(err) => {
      log::warn!("cover of book {} is unreadable: {}", id, err);
      None
    }
  };
  Ok(BookDetails {
    record,
    cover_width: dimensions.map(|(width, _)| width),
    cover_height: dimensions.map(|(_, height)| height),
  })
}

pub fn add_book<S: SlotBackend, G: IdGenerator>(
  shelf: &mut Bookshelf<S, G>,
  fields: NewBook,
  cover_path: Option<&Path>,
  options: NormalizeOptions,
) -> Result<BookRecord, String> {
  let mut form = BookForm::new();
  form.fields = fields;
  if let Some(path) = cover_path {
    form
      .pick_cover(path, options)
      .map_err(|err| format!("{}: {}", path.display(), err))?;
  }
  form.submit(shelf).map_err(|err| err.to_string())
}

pub fn remove_book<S: SlotBackend, G: IdGenerator>(
  shelf: &mut Bookshelf<S, G>,
  id: i64,
) -> Result<Option<BookRecord>, String> {
  shelf.remove(id).map_err(|err| err.to_string())
}

pub fn normalize_cover(path: &Path, options: NormalizeOptions) -> Result<EncodedImage, String> {
  cover::normalize_file(path, options).map_err(|err| format!("{}: {}", path.display(), err))
}

/// Writes a book's inline cover to `target`. A directory target gets a
/// `cover_<id>.<ext>` file inside it.
pub fn export_cover<S: SlotBackend, G: IdGenerator>(
  shelf: &Bookshelf<S, G>,
  id: i64,
  target: &Path,
) -> Result<PathBuf, String> {
  let record = shelf.get(id).ok_or_else(|| format!("No book with id {}", id))?;
  let (mime, bytes) = cover::decode_data_uri(&record.image).map_err(|err| err.to_string())?;
  let path = if target.is_dir() {
    target.join(format!("cover_{}.{}", id, cover::extension_for_mime(&mime)))
  } else {
    target.to_path_buf()
  };
  std::fs::write(&path, bytes).map_err(|err| err.to_string())?;
  log::info!("cover of book {} exported to {}", id, path.display());
  Ok(path)
}
