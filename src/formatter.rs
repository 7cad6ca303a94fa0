//! Terminal rendering for the shelf.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::models::{BookDetails, BookRecord};

const TITLE_WIDTH: usize = 40;

pub fn format_shelf(books: &[BookRecord]) -> String {
    if books.is_empty() {
        return "The shelf is empty. Add a book with `bookshelf add`.".to_string();
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["id", "title", "author", "recommender"]);
    for book in books {
        table.add_row(vec![
            Cell::new(book.id),
            Cell::new(truncate(&book.title, TITLE_WIDTH)),
            Cell::new(&book.author),
            Cell::new(&book.recommender),
        ]);
    }
    format!("{}\n{} book(s)", table, books.len())
}

pub fn format_details(details: &BookDetails) -> String {
    let book = &details.record;
    let cover = match (details.cover_width, details.cover_height) {
        (Some(width), Some(height)) => format!("{}x{} ({} bytes inline)", width, height, book.image.len()),
        _ => "unreadable".to_string(),
    };
    format!(
        "{}\n\nAuthor:      {}\nDescription: {}\nRecommender: {}\nCover:       {}\nId:          {}",
        book.title, book.author, book.description, book.recommender, cover, book.id
    )
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| err.to_string())
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let kept: String = value.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
