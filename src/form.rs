use std::path::Path;

use crate::cover::{normalize_file, CoverSelection, EncodedImage, NormalizeOptions, SelectionTicket};
use crate::db::SlotBackend;
use crate::error::{DecodeError, StoreError};
use crate::ids::IdGenerator;
use crate::models::{BookRecord, NewBook};
use crate::store::Bookshelf;

/// Pending "add a book" form. Holds the text fields and the latest
/// normalized cover until it is submitted.
#[derive(Debug, Default)]
pub struct BookForm {
    pub fields: NewBook,
    cover: Option<EncodedImage>,
    selection: CoverSelection,
}

impl BookForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cover(&self) -> Option<&EncodedImage> {
        self.cover.as_ref()
    }

    /// Starts a new cover pick. Results for earlier tickets are ignored.
    pub fn begin_cover(&self) -> SelectionTicket {
        self.selection.begin()
    }

    /// Stores a finished normalization if `ticket` is still the latest pick.
    /// Returns whether the cover was taken.
    pub fn finish_cover(
        &mut self,
        ticket: SelectionTicket,
        result: Result<EncodedImage, DecodeError>,
    ) -> Result<bool, DecodeError> {
        let Some(result) = self.selection.accept(ticket, result) else {
            return Ok(false);
        };
        let encoded = result?;
        self.fields.image = encoded.data_uri.clone();
        self.cover = Some(encoded);
        Ok(true)
    }

    pub fn pick_cover(&mut self, path: &Path, options: NormalizeOptions) -> Result<bool, DecodeError> {
        let ticket = self.begin_cover();
        let result = normalize_file(path, options);
        self.finish_cover(ticket, result)
    }

    /// Adds the form to the shelf and clears it. On failure the form keeps
    /// its contents so the user can fix them.
    pub fn submit<S: SlotBackend, G: IdGenerator>(
        &mut self,
        shelf: &mut Bookshelf<S, G>,
    ) -> Result<BookRecord, StoreError> {
        let record = shelf.add(self.fields.clone())?;
        self.fields = NewBook::default();
        self.cover = None;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::BookForm;
    use crate::cover::EncodedImage;
    use crate::db::MemorySlots;
    use crate::error::{DecodeError, StoreError, ValidationError};
    use crate::ids::SequentialIds;
    use crate::store::{Bookshelf, DEFAULT_SLOT};

    fn encoded(tag: &str) -> EncodedImage {
        EncodedImage {
            data_uri: format!("data:image/jpeg;base64,{}", tag),
            width: 10,
            height: 10,
        }
    }

    #[test]
    fn slow_first_pick_does_not_replace_second() {
        let mut form = BookForm::new();
        let first = form.begin_cover();
        let second = form.begin_cover();

        assert!(form.finish_cover(second, Ok(encoded("BBBB"))).expect("second"));
        assert!(!form.finish_cover(first, Ok(encoded("AAAA"))).expect("first"));
        assert_eq!(form.fields.image, "data:image/jpeg;base64,BBBB");
    }

    #[test]
    fn stale_failure_is_ignored_too() {
        let mut form = BookForm::new();
        let first = form.begin_cover();
        let second = form.begin_cover();
        form.finish_cover(second, Ok(encoded("BBBB"))).expect("second");

        assert!(!form
            .finish_cover(first, Err(DecodeError::Empty))
            .expect("stale errors are dropped"));
        assert!(form.cover().is_some());
    }

    #[test]
    fn submit_clears_form_only_on_success() {
        let slots = MemorySlots::new();
        let mut shelf = Bookshelf::new(&slots, SequentialIds::starting_at(1), DEFAULT_SLOT);
        let mut form = BookForm::new();
        form.fields.title = "The Selfish Gene".to_string();

        assert!(matches!(
            form.submit(&mut shelf),
            Err(StoreError::Validation(ValidationError::MissingImage))
        ));
        assert_eq!(form.fields.title, "The Selfish Gene");

        let ticket = form.begin_cover();
        form.finish_cover(ticket, Ok(encoded("QUJD"))).expect("cover");
        let record = form.submit(&mut shelf).expect("submit");

        assert_eq!(record.title, "The Selfish Gene");
        assert!(form.fields.title.is_empty());
        assert!(form.cover().is_none());
        assert_eq!(shelf.books().len(), 1);
    }
}
