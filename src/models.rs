use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recommender: String,
    pub image: String, // data URI
}

/// Form contents for a book that has not been assigned an id yet.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub recommender: String,
    pub image: String,
}

impl NewBook {
    pub fn into_record(self, id: i64) -> BookRecord {
        BookRecord {
            id,
            title: self.title,
            author: self.author,
            description: self.description,
            recommender: self.recommender,
            image: self.image,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    #[serde(flatten)]
    pub record: BookRecord,
    pub cover_width: Option<u32>,
    pub cover_height: Option<u32>,
}
