use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;
use tokio::task;

use super::models::{NewImageLabel, NewImageTextKeyword, NewLabel, NewTextKeyword};
use crate::modules::media::domain::{Image, ImageRepository, NewImage};
use crate::schema::{image_labels, image_text_keywords, images, labels, text_keywords};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::database::{Database, DbConnection};

pub struct ImageRepositoryImpl {
    db: Arc<Database>,
}

impl ImageRepositoryImpl {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Run a blocking Diesel operation on a pooled connection
    fn with_conn<T, F>(&self, operation: F) -> AppResult<T>
    where
        F: FnOnce(&mut DbConnection) -> AppResult<T>,
    {
        let db = Arc::clone(&self.db);
        task::block_in_place(move || {
            let mut conn = db.get_connection()?;
            operation(&mut conn)
        })
    }
}

/// Insert the label if missing and return its id
fn get_or_create_label(conn: &mut PgConnection, name: &str) -> QueryResult<i64> {
    diesel::insert_into(labels::table)
        .values(&NewLabel { name })
        .on_conflict(labels::name)
        .do_nothing()
        .execute(conn)?;

    labels::table
        .filter(labels::name.eq(name))
        .select(labels::id)
        .first(conn)
}

/// An update that matched no row means the image is gone
fn ensure_updated(updated: usize, image_id: i64) -> AppResult<()> {
    if updated == 0 {
        return Err(AppError::NotFound(format!("Image {} not found", image_id)));
    }
    Ok(())
}

fn get_or_create_keyword(conn: &mut PgConnection, keyword: &str) -> QueryResult<i64> {
    diesel::insert_into(text_keywords::table)
        .values(&NewTextKeyword { keyword })
        .on_conflict(text_keywords::keyword)
        .do_nothing()
        .execute(conn)?;

    text_keywords::table
        .filter(text_keywords::keyword.eq(keyword))
        .select(text_keywords::id)
        .first(conn)
}

#[async_trait]
impl ImageRepository for ImageRepositoryImpl {
    async fn create(&self, image: NewImage) -> AppResult<Image> {
        self.with_conn(move |conn| {
            diesel::insert_into(images::table)
                .values(&image)
                .returning(Image::as_returning())
                .get_result(conn)
                .map_err(|e| AppError::DatabaseError(format!("Failed to create image: {}", e)))
        })
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Image>> {
        self.with_conn(move |conn| {
            images::table
                .find(id)
                .select(Image::as_select())
                .first(conn)
                .optional()
                .map_err(|e| AppError::DatabaseError(format!("Failed to find image: {}", e)))
        })
    }

    async fn get_by_label_detected(&self, detected: bool) -> AppResult<Vec<Image>> {
        self.with_conn(move |conn| {
            images::table
                .filter(images::label_detected.eq(detected))
                .order(images::id.asc())
                .select(Image::as_select())
                .load(conn)
                .map_err(|e| AppError::DatabaseError(format!("Failed to load images: {}", e)))
        })
    }

    async fn get_by_text_detected(&self, detected: bool) -> AppResult<Vec<Image>> {
        self.with_conn(move |conn| {
            images::table
                .filter(images::text_detected.eq(detected))
                .order(images::id.asc())
                .select(Image::as_select())
                .load(conn)
                .map_err(|e| AppError::DatabaseError(format!("Failed to load images: {}", e)))
        })
    }

    async fn mark_label_detected(&self, id: i64) -> AppResult<()> {
        self.with_conn(move |conn| {
            let updated = diesel::update(images::table.find(id))
                .set(images::label_detected.eq(true))
                .execute(conn)?;
            ensure_updated(updated, id)
        })
    }

    async fn mark_text_detected(&self, id: i64) -> AppResult<()> {
        self.with_conn(move |conn| {
            let updated = diesel::update(images::table.find(id))
                .set(images::text_detected.eq(true))
                .execute(conn)?;
            ensure_updated(updated, id)
        })
    }

    async fn save_labels(&self, image_id: i64, names: Vec<String>) -> AppResult<usize> {
        self.with_conn(move |conn| {
            conn.transaction::<usize, AppError, _>(|conn| {
                let mut linked = 0;
                for name in &names {
                    let label_id = get_or_create_label(conn, name)?;
                    linked += diesel::insert_into(image_labels::table)
                        .values(&NewImageLabel { image_id, label_id })
                        .on_conflict((image_labels::image_id, image_labels::label_id))
                        .do_nothing()
                        .execute(conn)?;
                }

                let updated = diesel::update(images::table.find(image_id))
                    .set(images::label_detected.eq(true))
                    .execute(conn)?;
                // a missing image rolls the links back
                ensure_updated(updated, image_id)?;

                Ok(linked)
            })
            .map_err(|e| match e {
                not_found @ AppError::NotFound(_) => not_found,
                other => AppError::DatabaseError(format!("Failed to save labels: {}", other)),
            })
        })
    }

    async fn save_text_keywords(&self, image_id: i64, keywords: Vec<String>) -> AppResult<usize> {
        self.with_conn(move |conn| {
            conn.transaction::<usize, AppError, _>(|conn| {
                let mut linked = 0;
                for keyword in &keywords {
                    let text_keyword_id = get_or_create_keyword(conn, keyword)?;
                    linked += diesel::insert_into(image_text_keywords::table)
                        .values(&NewImageTextKeyword {
                            image_id,
                            text_keyword_id,
                        })
                        .on_conflict((
                            image_text_keywords::image_id,
                            image_text_keywords::text_keyword_id,
                        ))
                        .do_nothing()
                        .execute(conn)?;
                }

                let updated = diesel::update(images::table.find(image_id))
                    .set(images::text_detected.eq(true))
                    .execute(conn)?;
                // a missing image rolls the links back
                ensure_updated(updated, image_id)?;

                Ok(linked)
            })
            .map_err(|e| match e {
                not_found @ AppError::NotFound(_) => not_found,
                other => AppError::DatabaseError(format!("Failed to save text keywords: {}", other)),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_of_missing_image_is_not_found() {
        let err = ensure_updated(0, 42).unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref msg) if msg.contains("42")));
        assert!(ensure_updated(1, 42).is_ok());
    }
}
