use serde::Serialize;

use biblio_http::error::AppError;

use super::models::BookRow;

/// Public wire representation of a book.
#[derive(Debug, Clone, Serialize)]
pub struct BookResource {
    pub id: i64,
    pub type_id: i64,
    pub type_name: String,
    pub name: String,
    pub writer: String,
    pub publishdate: Option<String>,
    pub summary: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl BookResource {
    /// Shape a stored row for the wire. Every book must resolve its type; a
    /// row that cannot violates the write-time invariant and is reported as
    /// an integrity failure rather than serialized with a hole.
    pub fn project(row: BookRow) -> Result<Self, AppError> {
        let type_name = row.type_name.ok_or_else(|| {
            AppError::data_integrity(format!(
                "book {} references missing type {}",
                row.id, row.type_id
            ))
        })?;

        Ok(Self {
            id: row.id,
            type_id: row.type_id,
            type_name,
            name: row.name,
            writer: row.writer,
            publishdate: row.publishdate,
            summary: row.summary,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> BookRow {
        BookRow {
            id: 7,
            type_id: 2,
            name: "The Once and Future King".to_string(),
            writer: "T.H. White".to_string(),
            publishdate: Some("1958-01-01".to_string()),
            summary: None,
            created_at: "2024-03-01 09:30:00".to_string(),
            updated_at: "2024-03-02 10:00:00".to_string(),
            type_name: Some("Fantasy".to_string()),
        }
    }

    #[test]
    fn projects_all_fields() {
        let resource = BookResource::project(row()).unwrap();

        assert_eq!(resource.id, 7);
        assert_eq!(resource.type_name, "Fantasy");
        assert_eq!(resource.publishdate.as_deref(), Some("1958-01-01"));
        assert_eq!(resource.created_at, "2024-03-01 09:30:00");
    }

    #[test]
    fn unresolved_type_is_an_integrity_error() {
        let mut orphan = row();
        orphan.type_name = None;

        let err = BookResource::project(orphan).unwrap_err();
        assert!(matches!(err, AppError::DataIntegrity { .. }));
    }
}
