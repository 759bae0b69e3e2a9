/// A titled PDF document with a short summary, stored on disk next to
/// the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Dossier {
    /// Database row id.
    pub id: i64,
    /// Unique title, case-insensitive. Doubles as the file name.
    pub title: String,
    pub summary: String,
}

impl Dossier {
    pub fn new(title: String) -> Self {
        Self {
            id: 0,
            title,
            summary: "No summary set.".to_string(),
        }
    }
}
