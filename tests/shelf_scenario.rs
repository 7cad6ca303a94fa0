use bookshelf_lib::cover::{decode_data_uri_image, normalize, NormalizeOptions};
use bookshelf_lib::db::{SlotBackend, SqliteSlots};
use bookshelf_lib::ids::ClockIds;
use bookshelf_lib::models::NewBook;
use bookshelf_lib::store::{Bookshelf, DEFAULT_SLOT};
use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
use std::collections::HashSet;
use std::io::Cursor;

fn cover_uri(width: u32, height: u32) -> String {
    let mut bytes = Cursor::new(Vec::new());
    RgbImage::from_pixel(width, height, Rgb([247, 243, 233]))
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode png");
    normalize(bytes.into_inner(), NormalizeOptions::default())
        .expect("normalize")
        .data_uri
}

fn book(title: &str, image: &str) -> NewBook {
    NewBook {
        title: title.to_string(),
        author: String::new(),
        description: String::new(),
        recommender: String::new(),
        image: image.to_string(),
    }
}

#[test]
fn add_three_delete_middle_and_reopen_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = cover_uri(400, 600);

    let expected = {
        let slots = SqliteSlots::open_in(dir.path()).expect("open");
        let mut shelf = Bookshelf::new(slots, ClockIds::new(), DEFAULT_SLOT);
        shelf.load().expect("load");

        shelf.add(book("A", &image)).expect("add A");
        let b = shelf.add(book("B", &image)).expect("add B");
        shelf.add(book("C", &image)).expect("add C");
        shelf.remove(b.id).expect("remove B");

        let titles: Vec<&str> = shelf.books().iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);
        shelf.books().to_vec()
    };

    let slots = SqliteSlots::open_in(dir.path()).expect("reopen");
    let mut shelf = Bookshelf::new(slots, ClockIds::new(), DEFAULT_SLOT);
    assert_eq!(shelf.load().expect("reload"), expected.as_slice());
}

#[test]
fn rapid_inserts_get_distinct_ids() {
    let slots = SqliteSlots::open_in_memory().expect("open");
    let mut shelf = Bookshelf::new(slots, ClockIds::new(), DEFAULT_SLOT);
    let image = "data:image/jpeg;base64,/9j/";

    for n in 0..200 {
        shelf.add(book(&format!("book {n}"), image)).expect("add");
    }

    let ids: HashSet<i64> = shelf.books().iter().map(|b| b.id).collect();
    assert_eq!(ids.len(), 200);
}

#[test]
fn corrupt_database_slot_does_not_block_startup() {
    let slots = SqliteSlots::open_in_memory().expect("open");
    slots.write(DEFAULT_SLOT, "[{\"id\": 1, \"title\":").expect("seed");

    let mut shelf = Bookshelf::new(slots, ClockIds::new(), DEFAULT_SLOT);
    assert!(shelf.load().expect("load").is_empty());
    assert!(shelf
        .backend()
        .read("bookshelf.corrupt")
        .expect("read")
        .is_some());
}

#[test]
fn normalized_covers_never_exceed_the_bound() {
    for (width, height) in [(301, 10), (10, 301), (1024, 1024), (2000, 900), (299, 299)] {
        let uri = cover_uri(width, height);
        let (w, h) = decode_data_uri_image(&uri).expect("decode").dimensions();
        assert!(w.max(h) <= 300, "{width}x{height} became {w}x{h}");
        if width.max(height) <= 300 {
            assert_eq!((w, h), (width, height));
        }
    }
}
