use serde::Deserialize;
use sqlx::FromRow;
use time::macros::format_description;

use biblio_http::error::{AppError, FieldError};

use super::store::TypeLookup;

/// Stored book row, joined with the name of its type.
///
/// `type_name` is nullable at this level only because the join is outer; the
/// projection treats a missing type as an integrity failure.
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: i64,
    pub type_id: i64,
    pub name: String,
    pub writer: String,
    pub publishdate: Option<String>,
    pub summary: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub type_name: Option<String>,
}

/// Request body of create and update, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPayload {
    pub type_id: Option<i64>,
    pub name: Option<String>,
    pub writer: Option<String>,
    pub publishdate: Option<String>,
    pub summary: Option<String>,
}

/// Validated payload for inserting a book.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub type_id: i64,
    pub name: String,
    pub writer: String,
    pub publishdate: Option<String>,
    pub summary: Option<String>,
}

/// Validated partial update. Fields left `None` keep their stored value.
#[derive(Debug, Clone)]
pub struct BookPatch {
    pub type_id: i64,
    pub name: Option<String>,
    pub writer: Option<String>,
    pub publishdate: Option<String>,
    pub summary: Option<String>,
}

fn valid_date(raw: &str) -> bool {
    time::Date::parse(raw, format_description!("[year]-[month]-[day]")).is_ok()
}

async fn check_type_id(
    type_id: Option<i64>,
    types: &dyn TypeLookup,
    errors: &mut Vec<FieldError>,
) -> anyhow::Result<()> {
    match type_id {
        None => errors.push(FieldError::new("type_id", "required")),
        Some(id) => {
            if !types.type_exists(id).await? {
                errors.push(FieldError::new(
                    "type_id",
                    format!("type {id} does not exist"),
                ));
            }
        }
    }
    Ok(())
}

fn check_publishdate(publishdate: &Option<String>, errors: &mut Vec<FieldError>) {
    if let Some(raw) = publishdate {
        if !valid_date(raw) {
            errors.push(FieldError::new(
                "publishdate",
                "must be a valid date (YYYY-MM-DD)",
            ));
        }
    }
}

/// Validate a create payload: `type_id` must reference an existing type,
/// `name` and `writer` are required non-empty, `publishdate` must parse when
/// present.
pub async fn validate_create(
    payload: BookPayload,
    types: &dyn TypeLookup,
) -> Result<NewBook, AppError> {
    let mut errors = Vec::new();

    check_type_id(payload.type_id, types, &mut errors).await?;

    match &payload.name {
        Some(name) if !name.is_empty() => {}
        Some(_) => errors.push(FieldError::new("name", "must not be empty")),
        None => errors.push(FieldError::new("name", "required")),
    }
    match &payload.writer {
        Some(writer) if !writer.is_empty() => {}
        Some(_) => errors.push(FieldError::new("writer", "must not be empty")),
        None => errors.push(FieldError::new("writer", "required")),
    }

    check_publishdate(&payload.publishdate, &mut errors);

    if !errors.is_empty() {
        return Err(AppError::validation(errors, "book payload failed validation"));
    }

    // Checked non-None above.
    let type_id = payload.type_id.unwrap_or_default();
    Ok(NewBook {
        type_id,
        name: payload.name.unwrap_or_default(),
        writer: payload.writer.unwrap_or_default(),
        publishdate: payload.publishdate,
        summary: payload.summary,
    })
}

/// Validate an update payload: `type_id` stays required and must exist; the
/// remaining fields are optional but must be well-formed when present.
pub async fn validate_update(
    payload: BookPayload,
    types: &dyn TypeLookup,
) -> Result<BookPatch, AppError> {
    let mut errors = Vec::new();

    check_type_id(payload.type_id, types, &mut errors).await?;

    if matches!(&payload.name, Some(name) if name.is_empty()) {
        errors.push(FieldError::new("name", "must not be empty"));
    }
    if matches!(&payload.writer, Some(writer) if writer.is_empty()) {
        errors.push(FieldError::new("writer", "must not be empty"));
    }

    check_publishdate(&payload.publishdate, &mut errors);

    if !errors.is_empty() {
        return Err(AppError::validation(errors, "book payload failed validation"));
    }

    Ok(BookPatch {
        type_id: payload.type_id.unwrap_or_default(),
        name: payload.name,
        writer: payload.writer,
        publishdate: payload.publishdate,
        summary: payload.summary,
    })
}
