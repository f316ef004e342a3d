//! Persistence ports for the books module and their SQLite implementation.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};

use biblio_db::Db;

use super::models::{BookPatch, BookRow, NewBook};
use super::query::{FilterDirective, ListQuery, Selection};

/// Persistence capabilities the book handlers need.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn fetch_page(&self, query: &ListQuery) -> anyhow::Result<(Vec<BookRow>, i64)>;
    async fn fetch_by_id(&self, id: i64) -> anyhow::Result<Option<BookRow>>;
    async fn exists(&self, id: i64) -> anyhow::Result<bool>;
    async fn insert(&self, book: &NewBook) -> anyhow::Result<BookRow>;
    async fn update(&self, id: i64, patch: &BookPatch) -> anyhow::Result<Option<BookRow>>;
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
}

/// Resolver for the `types` lookup table.
#[async_trait]
pub trait TypeLookup: Send + Sync {
    async fn type_exists(&self, id: i64) -> anyhow::Result<bool>;
}

/// Every fetch resolves the type name in the same statement, so projection
/// needs no extra round trip.
const SELECT_BOOKS: &str = "SELECT b.id, b.type_id, b.name, b.writer, b.publishdate, b.summary, \
     b.created_at, b.updated_at, t.name AS type_name \
     FROM books b LEFT JOIN types t ON t.id = b.type_id";

pub struct SqliteBookStore {
    pool: Db,
}

impl SqliteBookStore {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }
}

/// Quote a client-supplied field as a book column identifier. The name is not
/// checked against the schema; an unknown column surfaces as a store error.
fn column(field: &str) -> String {
    format!("b.\"{}\"", field.replace('"', "\"\""))
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &[FilterDirective]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        builder.push(column(&filter.field));
        builder.push(" LIKE ");
        builder.push_bind(format!("%{}%", filter.needle));
    }
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn fetch_page(&self, query: &ListQuery) -> anyhow::Result<(Vec<BookRow>, i64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM books b");
        if let Selection::Filtered(filters) = &query.selection {
            push_filters(&mut count, filters);
        }
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("failed to count books")?;

        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_BOOKS);
        match &query.selection {
            Selection::Filtered(filters) => {
                push_filters(&mut builder, filters);
                builder.push(" ORDER BY b.id DESC");
            }
            Selection::Sorted(sorts) => {
                for (i, sort) in sorts.iter().enumerate() {
                    builder.push(if i == 0 { " ORDER BY " } else { ", " });
                    builder.push(column(&sort.field));
                    builder.push(sort.direction.sql());
                }
            }
        }
        builder.push(" LIMIT ");
        builder.push_bind(query.limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.offset());

        let rows = builder
            .build_query_as::<BookRow>()
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch books page")?;

        Ok((rows, total))
    }

    async fn fetch_by_id(&self, id: i64) -> anyhow::Result<Option<BookRow>> {
        let sql = format!("{SELECT_BOOKS} WHERE b.id = ?");
        let row = sqlx::query_as::<_, BookRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to fetch book {id}"))?;
        Ok(row)
    }

    async fn exists(&self, id: i64) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert(&self, book: &NewBook) -> anyhow::Result<BookRow> {
        let result = sqlx::query(
            "INSERT INTO books (type_id, name, writer, publishdate, summary) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(book.type_id)
        .bind(&book.name)
        .bind(&book.writer)
        .bind(&book.publishdate)
        .bind(&book.summary)
        .execute(&self.pool)
        .await
        .context("failed to insert book")?;

        let id = result.last_insert_rowid();
        // Reload to pick up store-assigned id and timestamps.
        self.fetch_by_id(id)
            .await?
            .context("inserted book row vanished before reload")
    }

    async fn update(&self, id: i64, patch: &BookPatch) -> anyhow::Result<Option<BookRow>> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE books SET type_id = ");
        builder.push_bind(patch.type_id);
        if let Some(name) = &patch.name {
            builder.push(", name = ");
            builder.push_bind(name);
        }
        if let Some(writer) = &patch.writer {
            builder.push(", writer = ");
            builder.push_bind(writer);
        }
        if let Some(publishdate) = &patch.publishdate {
            builder.push(", publishdate = ");
            builder.push_bind(publishdate);
        }
        if let Some(summary) = &patch.summary {
            builder.push(", summary = ");
            builder.push_bind(summary);
        }
        builder.push(", updated_at = datetime('now') WHERE id = ");
        builder.push_bind(id);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to update book {id}"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_by_id(id).await
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete book {id}"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TypeLookup for SqliteBookStore {
    async fn type_exists(&self, id: i64) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM types WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::query::{Direction, ListParams, SortDirective};
    use biblio_kernel::settings::DatabaseSettings;

    async fn test_store() -> SqliteBookStore {
        let pool = biblio_db::connect(&DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
        .unwrap();

        sqlx::raw_sql(
            "CREATE TABLE types (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL);
             CREATE TABLE books (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 type_id INTEGER NOT NULL REFERENCES types (id),
                 name TEXT NOT NULL,
                 writer TEXT NOT NULL,
                 publishdate TEXT,
                 summary TEXT,
                 created_at TEXT NOT NULL DEFAULT (datetime('now')),
                 updated_at TEXT NOT NULL DEFAULT (datetime('now'))
             );
             INSERT INTO types (name) VALUES ('Fantasy'), ('History');",
        )
        .execute(&pool)
        .await
        .unwrap();

        SqliteBookStore::new(pool)
    }

    fn book(type_id: i64, name: &str, writer: &str) -> NewBook {
        NewBook {
            type_id,
            name: name.to_string(),
            writer: writer.to_string(),
            publishdate: None,
            summary: None,
        }
    }

    fn list_query(params: ListParams) -> ListQuery {
        crate::modules::books::query::parse(&params).unwrap()
    }

    #[tokio::test]
    async fn insert_reloads_store_assigned_fields() {
        let store = test_store().await;

        let row = store.insert(&book(1, "Dune", "Frank Herbert")).await.unwrap();

        assert!(row.id > 0);
        assert_eq!(row.type_name.as_deref(), Some("Fantasy"));
        assert!(!row.created_at.is_empty());
        assert_eq!(row.created_at, row.updated_at);
    }

    #[tokio::test]
    async fn default_listing_is_newest_first() {
        let store = test_store().await;
        store.insert(&book(1, "First", "A")).await.unwrap();
        store.insert(&book(1, "Second", "B")).await.unwrap();
        store.insert(&book(2, "Third", "C")).await.unwrap();

        let (rows, total) = store
            .fetch_page(&list_query(ListParams::default()))
            .await
            .unwrap();

        assert_eq!(total, 3);
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Third", "Second", "First"]);
    }

    #[tokio::test]
    async fn filters_are_substring_matches_and_anded() {
        let store = test_store().await;
        store
            .insert(&book(1, "Harry Potter", "J.K. Rowling"))
            .await
            .unwrap();
        store
            .insert(&book(1, "Harry's Garden", "A. Gardener"))
            .await
            .unwrap();
        store.insert(&book(2, "Rome", "T. Historian")).await.unwrap();

        let query = list_query(ListParams {
            filters: Some("name:Harry,writer:Rowling".to_string()),
            ..ListParams::default()
        });
        let (rows, total) = store.fetch_page(&query).await.unwrap();

        assert_eq!(total, 1);
        assert_eq!(rows[0].name, "Harry Potter");
    }

    #[tokio::test]
    async fn explicit_sort_applies_in_directive_order() {
        let store = test_store().await;
        store.insert(&book(1, "Beta", "Same")).await.unwrap();
        store.insert(&book(1, "Alpha", "Same")).await.unwrap();
        store.insert(&book(1, "Alpha", "Other")).await.unwrap();

        let query = list_query(ListParams {
            sorts: Some("name:asc,id:desc".to_string()),
            ..ListParams::default()
        });
        let (rows, _) = store.fetch_page(&query).await.unwrap();

        assert_eq!(rows[0].name, "Alpha");
        assert_eq!(rows[1].name, "Alpha");
        assert!(rows[0].id > rows[1].id);
        assert_eq!(rows[2].name, "Beta");
    }

    #[tokio::test]
    async fn sorts_selection_ignores_filter_directives() {
        let store = test_store().await;
        store.insert(&book(1, "Match", "A")).await.unwrap();
        store.insert(&book(1, "Other", "B")).await.unwrap();

        let query = ListQuery {
            selection: Selection::Sorted(vec![SortDirective {
                field: "id".to_string(),
                direction: Direction::Asc,
            }]),
            limit: 10,
            page: 1,
        };
        let (rows, total) = store.fetch_page(&query).await.unwrap();

        assert_eq!(total, 2);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].id < rows[1].id);
    }

    #[tokio::test]
    async fn pagination_slices_by_limit_and_page() {
        let store = test_store().await;
        for i in 0..5 {
            store.insert(&book(1, &format!("Book {i}"), "W")).await.unwrap();
        }

        let query = list_query(ListParams {
            limit: Some("2".to_string()),
            page: Some("2".to_string()),
            ..ListParams::default()
        });
        let (rows, total) = store.fetch_page(&query).await.unwrap();

        assert_eq!(total, 5);
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Book 2", "Book 1"]);
    }

    #[tokio::test]
    async fn unknown_filter_field_is_a_store_error() {
        let store = test_store().await;
        store.insert(&book(1, "Any", "W")).await.unwrap();

        let query = list_query(ListParams {
            filters: Some("shelf:A3".to_string()),
            ..ListParams::default()
        });
        assert!(store.fetch_page(&query).await.is_err());
    }

    #[tokio::test]
    async fn partial_update_keeps_absent_fields() {
        let store = test_store().await;
        let created = store
            .insert(&NewBook {
                publishdate: Some("1965-08-01".to_string()),
                summary: Some("Spice".to_string()),
                ..book(1, "Dune", "Frank Herbert")
            })
            .await
            .unwrap();

        let patch = BookPatch {
            type_id: 2,
            name: Some("Dune (revised)".to_string()),
            writer: None,
            publishdate: None,
            summary: None,
        };
        let updated = store.update(created.id, &patch).await.unwrap().unwrap();

        assert_eq!(updated.name, "Dune (revised)");
        assert_eq!(updated.writer, "Frank Herbert");
        assert_eq!(updated.publishdate.as_deref(), Some("1965-08-01"));
        assert_eq!(updated.type_id, 2);
        assert_eq!(updated.type_name.as_deref(), Some("History"));
    }

    #[tokio::test]
    async fn update_missing_id_reports_none() {
        let store = test_store().await;
        let patch = BookPatch {
            type_id: 1,
            name: None,
            writer: None,
            publishdate: None,
            summary: None,
        };
        assert!(store.update(404, &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let store = test_store().await;
        let created = store.insert(&book(1, "Gone", "W")).await.unwrap();

        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.delete(created.id).await.unwrap());
        assert!(!store.exists(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn type_lookup_checks_the_types_table() {
        let store = test_store().await;
        assert!(store.type_exists(1).await.unwrap());
        assert!(!store.type_exists(42).await.unwrap());
    }
}
