use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::db::SlotBackend;
use crate::error::{PersistenceParseError, StoreError, ValidationError};
use crate::ids::IdGenerator;
use crate::models::{BookRecord, NewBook};

pub const DEFAULT_SLOT: &str = "bookshelf";
pub const SHELF_VERSION: u32 = 1;

static DATA_URI_RE: OnceLock<Regex> = OnceLock::new();

#[derive(Serialize)]
struct ShelfEnvelopeRef<'a> {
    version: u32,
    books: &'a [BookRecord],
}

#[derive(Deserialize)]
struct ShelfEnvelope {
    version: u32,
    books: Vec<BookRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredShelf {
    Versioned(ShelfEnvelope),
    // payloads written before the envelope existed
    Legacy(Vec<BookRecord>),
}

/// Parses a slot payload into the ordered list of books.
pub fn parse_shelf(raw: &str) -> Result<Vec<BookRecord>, PersistenceParseError> {
    match serde_json::from_str::<StoredShelf>(raw)? {
        StoredShelf::Versioned(envelope) if envelope.version == SHELF_VERSION => Ok(envelope.books),
        StoredShelf::Versioned(envelope) => {
            Err(PersistenceParseError::UnsupportedVersion(envelope.version))
        }
        StoredShelf::Legacy(books) => {
            log::info!("migrating unversioned shelf with {} books", books.len());
            Ok(books)
        }
    }
}

pub fn serialize_shelf(books: &[BookRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ShelfEnvelopeRef {
        version: SHELF_VERSION,
        books,
    })
}

pub fn validate(book: &NewBook) -> Result<(), ValidationError> {
    if book.title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    if book.image.is_empty() {
        return Err(ValidationError::MissingImage);
    }
    let re = DATA_URI_RE.get_or_init(|| {
        Regex::new(r"^data:image/[A-Za-z0-9.+-]+;base64,[A-Za-z0-9+/=\s]+$")
            .expect("data uri pattern")
    });
    if !re.is_match(&book.image) {
        return Err(ValidationError::ImageNotEmbedded);
    }
    Ok(())
}

/// The shelf: an ordered list of books mirrored to one persistent slot.
///
/// Every mutating call rewrites the whole slot before returning.
pub struct Bookshelf<S: SlotBackend, G: IdGenerator> {
    backend: S,
    ids: G,
    slot: String,
    books: Vec<BookRecord>,
    loaded: bool,
}

impl<S: SlotBackend, G: IdGenerator> Bookshelf<S, G> {
    pub fn new(backend: S, ids: G, slot: impl Into<String>) -> Self {
        Self {
            backend,
            ids,
            slot: slot.into(),
            books: Vec::new(),
            loaded: false,
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Empty until `load` has run.
    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    pub fn get(&self, id: i64) -> Option<&BookRecord> {
        self.books.iter().find(|book| book.id == id)
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Reads the slot. A missing slot is an empty shelf. A payload that
    /// does not parse is copied to `<slot>.corrupt`, logged, and the shelf
    /// starts empty. Only backend failures are returned as errors.
    pub fn load(&mut self) -> Result<&[BookRecord], StoreError> {
        let books = match self.backend.read(&self.slot)? {
            None => Vec::new(),
            Some(raw) => match parse_shelf(&raw) {
                Ok(books) => books,
                Err(err) => {
                    log::error!("failed to parse shelf slot {}: {}", self.slot, err);
                    let recovery = self.recovery_slot();
                    self.backend.write(&recovery, &raw)?;
                    log::warn!("kept unreadable shelf payload in slot {}", recovery);
                    Vec::new()
                }
            },
        };
        log::info!("loaded {} books from slot {}", books.len(), self.slot);
        self.books = books;
        self.loaded = true;
        Ok(&self.books)
    }

    pub fn recovery_slot(&self) -> String {
        format!("{}.corrupt", self.slot)
    }

    pub fn add(&mut self, book: NewBook) -> Result<BookRecord, StoreError> {
        validate(&book)?;
        let mut id = self.ids.next_id();
        while self.get(id).is_some() {
            id = self.ids.next_id();
        }
        let record = book.into_record(id);
        self.books.push(record.clone());
        if let Err(err) = self.persist() {
            self.books.pop();
            log::error!("failed to persist new book {}: {}", record.title, err);
            return Err(err);
        }
        log::info!("added book {}: {}", record.id, record.title);
        Ok(record)
    }

    /// Removes the first book with `id`. Persists even when nothing matched.
    pub fn remove(&mut self, id: i64) -> Result<Option<BookRecord>, StoreError> {
        let position = self.books.iter().position(|book| book.id == id);
        let removed = position.map(|index| self.books.remove(index));
        if let Err(err) = self.persist() {
            if let (Some(index), Some(book)) = (position, removed) {
                self.books.insert(index, book);
            }
            log::error!("failed to persist removal of book {}: {}", id, err);
            return Err(err);
        }
        match &removed {
            Some(book) => log::info!("removed book {}: {}", book.id, book.title),
            None => log::info!("remove skipped, no book with id {}", id),
        }
        Ok(removed)
    }

    pub fn persist(&self) -> Result<(), StoreError> {
        let payload = serialize_shelf(&self.books)?;
        self.backend.write(&self.slot, &payload)
    }
}
