use crate::{
    entities::{book, genre, Book, Genre},
    errors::ServiceError,
    events::{Event, EventSender},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Catalog service for books and genres.
///
/// Book writes and the derived genre `book_count` move together: every create,
/// genre re-assignment, and delete adjusts the affected counters inside the
/// same transaction as the book row itself, so the counter always equals the
/// number of books referencing the genre.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    // ---- Books ----

    pub async fn list_books(&self) -> Result<Vec<book::Model>, ServiceError> {
        Ok(Book::find().all(&*self.db).await?)
    }

    pub async fn get_book(&self, id: i32) -> Result<book::Model, ServiceError> {
        Book::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Book not found!".to_string()))
    }

    /// Substring search over title and author.
    pub async fn search_books(
        &self,
        title: Option<String>,
        author: Option<String>,
    ) -> Result<Vec<book::Model>, ServiceError> {
        let mut query = Book::find();
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            query = query.filter(book::Column::Title.contains(&title));
        }
        if let Some(author) = author.filter(|a| !a.is_empty()) {
            query = query.filter(book::Column::Author.contains(&author));
        }
        Ok(query.all(&*self.db).await?)
    }

    /// Filter by genre and/or price bounds.
    pub async fn filter_books(
        &self,
        genre_id: Option<i32>,
        min_price: Option<Decimal>,
        max_price: Option<Decimal>,
    ) -> Result<Vec<book::Model>, ServiceError> {
        let mut query = Book::find();
        if let Some(genre_id) = genre_id {
            query = query.filter(book::Column::GenreId.eq(genre_id));
        }
        if let Some(min_price) = min_price {
            query = query.filter(book::Column::Price.gte(min_price));
        }
        if let Some(max_price) = max_price {
            query = query.filter(book::Column::Price.lte(max_price));
        }
        Ok(query.all(&*self.db).await?)
    }

    /// Creates a book and increments its genre's book count in one transaction.
    #[instrument(skip(self))]
    pub async fn create_book(&self, input: CreateBookInput) -> Result<book::Model, ServiceError> {
        validate_book_fields(input.price, input.stock)?;

        let txn = self.db.begin().await?;

        let genre = Genre::find_by_id(input.genre_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::ValidationError("Invalid genreId.".to_string()))?;

        let book = book::ActiveModel {
            title: Set(input.title),
            author: Set(input.author),
            price: Set(input.price),
            stock: Set(input.stock),
            genre_id: Set(input.genre_id),
            ..Default::default()
        };
        let book = book.insert(&txn).await?;

        let count = genre.book_count;
        let mut genre: genre::ActiveModel = genre.into();
        genre.book_count = Set(count + 1);
        genre.update(&txn).await?;

        txn.commit().await?;

        self.event_sender.send_or_log(Event::BookCreated(book.id)).await;
        info!("Created book {}: {}", book.id, book.title);
        Ok(book)
    }

    /// Updates a book. When the genre reference changes, the old genre's count
    /// is decremented (never below zero) and the new genre's incremented,
    /// atomically with the book write.
    #[instrument(skip(self, input))]
    pub async fn update_book(
        &self,
        id: i32,
        input: UpdateBookInput,
    ) -> Result<book::Model, ServiceError> {
        if input.id != id {
            return Err(ServiceError::ValidationError("ID mismatch!".to_string()));
        }
        validate_book_fields(input.price, input.stock)?;

        let txn = self.db.begin().await?;

        let existing = Book::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Book not found!".to_string()))?;

        if existing.genre_id != input.genre_id {
            shift_genre_count(&txn, existing.genre_id, -1).await?;

            let new_genre = Genre::find_by_id(input.genre_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError("New genre not found!".to_string())
                })?;
            let count = new_genre.book_count;
            let mut new_genre: genre::ActiveModel = new_genre.into();
            new_genre.book_count = Set(count + 1);
            new_genre.update(&txn).await?;
        }

        let mut book: book::ActiveModel = existing.into();
        book.title = Set(input.title);
        book.author = Set(input.author);
        book.price = Set(input.price);
        book.stock = Set(input.stock);
        book.genre_id = Set(input.genre_id);
        let book = book.update(&txn).await?;

        txn.commit().await?;

        self.event_sender.send_or_log(Event::BookUpdated(book.id)).await;
        Ok(book)
    }

    /// Deletes a book and rebalances its genre's book count.
    #[instrument(skip(self))]
    pub async fn delete_book(&self, id: i32) -> Result<book::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let book = Book::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Book not found!".to_string()))?;

        book.clone().delete(&txn).await?;
        shift_genre_count(&txn, book.genre_id, -1).await?;

        txn.commit().await?;

        self.event_sender.send_or_log(Event::BookDeleted(id)).await;
        info!("Deleted book {}: {}", book.id, book.title);
        Ok(book)
    }

    // ---- Genres ----

    pub async fn list_genres(&self) -> Result<Vec<genre::Model>, ServiceError> {
        Ok(Genre::find().all(&*self.db).await?)
    }

    pub async fn get_genre(&self, id: i32) -> Result<genre::Model, ServiceError> {
        Genre::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Genre not found!".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn create_genre(&self, input: CreateGenreInput) -> Result<genre::Model, ServiceError> {
        let genre = genre::ActiveModel {
            name: Set(input.name),
            book_count: Set(0),
            ..Default::default()
        };
        let genre = genre.insert(&*self.db).await?;

        self.event_sender.send_or_log(Event::GenreCreated(genre.id)).await;
        Ok(genre)
    }

    #[instrument(skip(self, input))]
    pub async fn update_genre(
        &self,
        id: i32,
        input: UpdateGenreInput,
    ) -> Result<genre::Model, ServiceError> {
        if input.id != id {
            return Err(ServiceError::ValidationError(
                "ID does not match!".to_string(),
            ));
        }

        let genre = Genre::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Genre not found!".to_string()))?;

        let mut genre: genre::ActiveModel = genre.into();
        genre.name = Set(input.name);
        let genre = genre.update(&*self.db).await?;

        self.event_sender.send_or_log(Event::GenreUpdated(genre.id)).await;
        Ok(genre)
    }

    #[instrument(skip(self))]
    pub async fn delete_genre(&self, id: i32) -> Result<genre::Model, ServiceError> {
        let genre = Genre::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Genre not found!".to_string()))?;

        genre.clone().delete(&*self.db).await?;

        self.event_sender.send_or_log(Event::GenreDeleted(id)).await;
        Ok(genre)
    }
}

/// Adjusts a genre's derived book count by `delta`, clamped at a floor of
/// zero. A missing genre is a no-op: the counter belongs to the genre row,
/// and rebalancing must not fail a book write whose genre row is gone.
async fn shift_genre_count<C: ConnectionTrait>(
    conn: &C,
    genre_id: i32,
    delta: i32,
) -> Result<(), ServiceError> {
    let Some(genre) = Genre::find_by_id(genre_id).one(conn).await? else {
        return Ok(());
    };

    let next = (genre.book_count + delta).max(0);
    if next != genre.book_count {
        let mut genre: genre::ActiveModel = genre.into();
        genre.book_count = Set(next);
        genre.update(conn).await?;
    }
    Ok(())
}

fn validate_book_fields(price: Decimal, stock: i32) -> Result<(), ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Price must be non-negative".to_string(),
        ));
    }
    if stock < 0 {
        return Err(ServiceError::ValidationError(
            "Stock must be non-negative".to_string(),
        ));
    }
    Ok(())
}

/// Input for creating a book
#[derive(Debug, Deserialize)]
pub struct CreateBookInput {
    pub title: String,
    pub author: String,
    pub price: Decimal,
    pub stock: i32,
    pub genre_id: i32,
}

/// Input for updating a book; `id` must match the path parameter.
#[derive(Debug, Deserialize)]
pub struct UpdateBookInput {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub price: Decimal,
    pub stock: i32,
    pub genre_id: i32,
}

/// Input for creating a genre
#[derive(Debug, Deserialize)]
pub struct CreateGenreInput {
    pub name: String,
}

/// Input for updating a genre; `id` must match the path parameter.
#[derive(Debug, Deserialize)]
pub struct UpdateGenreInput {
    pub id: i32,
    pub name: String,
}
