//! Live-database tests for the guarded repository statements.
//!
//! These need a running Postgres; `#[sqlx::test]` creates a throwaway
//! database per test from `DATABASE_URL` and applies the migrations.

use books_api::model::{
    AuthorName, BookTitle, CreateAuthorRequest, CreateBookError, CreateBookRequest,
    DeleteAuthorError, FindAuthorError, UpdateAuthorRequest, UpdateBookError, UpdateBookRequest,
};
use books_api::postgres::Postgres;
use books_api::repository::{AuthorRepository, BookRepository};
use chrono::NaiveDate;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

fn name(raw: &str) -> AuthorName {
    AuthorName::new(raw).unwrap()
}

fn title(raw: &str) -> BookTitle {
    BookTitle::new(raw).unwrap()
}

fn date(raw: &str) -> NaiveDate {
    raw.parse().unwrap()
}

async fn insert_author(repo: &Postgres, first: &str, last: &str) -> Uuid {
    repo.create_author(&CreateAuthorRequest::new(name(first), name(last)))
        .await
        .unwrap()
}

async fn insert_book(repo: &Postgres, t: &str, author_id: Uuid) -> Uuid {
    repo.create_book(&CreateBookRequest::new(title(t), author_id, date("2000-01-01")))
        .await
        .unwrap()
}

#[sqlx::test(migrator = "books_api::postgres::MIGRATOR")]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn author_lifecycle_with_books(pool: PgPool) {
    let repo = Postgres::with_pool(pool);

    let a1 = insert_author(&repo, "Ada", "Lovelace").await;
    assert_eq!(repo.author_by_id(a1).await.unwrap().book_count(), 0);

    let b1 = insert_book(&repo, "Sketch of the Analytical Engine", a1).await;
    assert_eq!(repo.author_by_id(a1).await.unwrap().book_count(), 1);

    assert!(matches!(
        repo.delete_author(a1).await,
        Err(DeleteAuthorError::HasBooks { id }) if id == a1
    ));

    repo.delete_book(b1).await.unwrap();
    repo.delete_author(a1).await.unwrap();
    assert!(matches!(
        repo.author_by_id(a1).await,
        Err(FindAuthorError::NotFound { .. })
    ));
}

#[sqlx::test(migrator = "books_api::postgres::MIGRATOR")]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn delete_distinguishes_missing_author_from_author_with_books(pool: PgPool) {
    let repo = Postgres::with_pool(pool);

    let ghost = Uuid::new_v4();
    assert!(matches!(
        repo.delete_author(ghost).await,
        Err(DeleteAuthorError::NotFound { id }) if id == ghost
    ));

    let a1 = insert_author(&repo, "Mary", "Shelley").await;
    insert_book(&repo, "Frankenstein", a1).await;
    assert!(matches!(
        repo.delete_author(a1).await,
        Err(DeleteAuthorError::HasBooks { id }) if id == a1
    ));
}

#[sqlx::test(migrator = "books_api::postgres::MIGRATOR")]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn create_book_for_missing_author_writes_nothing(pool: PgPool) {
    let repo = Postgres::with_pool(pool);
    let ghost = Uuid::new_v4();

    let err = repo
        .create_book(&CreateBookRequest::new(
            title("Orphan"),
            ghost,
            date("2020-01-01"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, CreateBookError::AuthorMissing { author_id } if author_id == ghost));
    assert!(repo.books_by_author(ghost).await.unwrap().is_empty());
}

#[sqlx::test(migrator = "books_api::postgres::MIGRATOR")]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn update_book_revalidates_author(pool: PgPool) {
    let repo = Postgres::with_pool(pool);

    let a1 = insert_author(&repo, "Ursula", "Le Guin").await;
    let b1 = insert_book(&repo, "The Dispossessed", a1).await;

    let ghost = Uuid::new_v4();
    let err = repo
        .update_book(&UpdateBookRequest::new(
            b1,
            title("The Dispossessed"),
            ghost,
            date("1974-01-01"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, UpdateBookError::AuthorMissing { .. }));
    assert_eq!(repo.book_by_id(b1).await.unwrap().author_id(), a1);

    let err = repo
        .update_book(&UpdateBookRequest::new(
            Uuid::new_v4(),
            title("Nowhere"),
            a1,
            date("1974-01-01"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, UpdateBookError::NotFound { .. }));
}

#[sqlx::test(migrator = "books_api::postgres::MIGRATOR")]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn update_author_rewrites_both_names(pool: PgPool) {
    let repo = Postgres::with_pool(pool);

    let a1 = insert_author(&repo, "Charles", "Dickens").await;
    repo.update_author(&UpdateAuthorRequest::new(a1, name("Boz"), name("Dickens")))
        .await
        .unwrap();
    let author = repo.author_by_id(a1).await.unwrap();
    assert_eq!(author.first_name().as_str(), "Boz");
}

#[sqlx::test(migrator = "books_api::postgres::MIGRATOR")]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn author_by_name_breaks_ties_by_lowest_id(pool: PgPool) {
    let repo = Postgres::with_pool(pool);

    let first = insert_author(&repo, "John", "Smith").await;
    let second = insert_author(&repo, "John", "Smith").await;

    let found = repo
        .author_by_name(&name("John"), &name("Smith"))
        .await
        .unwrap();
    assert_eq!(found.id(), first.min(second));
}

#[sqlx::test(migrator = "books_api::postgres::MIGRATOR")]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn all_authors_reports_zero_for_bookless_authors(pool: PgPool) {
    let repo = Postgres::with_pool(pool);

    let prolific = insert_author(&repo, "Charles", "Dickens").await;
    let quiet = insert_author(&repo, "Harper", "Lee").await;
    insert_book(&repo, "Bleak House", prolific).await;
    insert_book(&repo, "Hard Times", prolific).await;

    let authors = repo.all_authors().await.unwrap();
    assert_eq!(authors.len(), 2);
    for author in authors {
        let expected = if author.id() == prolific { 2 } else { 0 };
        assert_eq!(author.book_count(), expected);
        assert!(author.id() == prolific || author.id() == quiet);
    }
}

#[sqlx::test(migrator = "books_api::postgres::MIGRATOR")]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn book_count_matches_books_by_author(pool: PgPool) {
    let repo = Postgres::with_pool(pool);

    let a1 = insert_author(&repo, "Octavia", "Butler").await;
    for t in ["Kindred", "Dawn", "Parable of the Sower"] {
        insert_book(&repo, t, a1).await;
    }

    let count = repo.author_by_id(a1).await.unwrap().book_count();
    let books = repo.books_by_author(a1).await.unwrap();
    assert_eq!(count, books.len() as i64);
}

// A book insert that has taken the author row's lock and written its row,
// but not yet committed, is invisible to a concurrently starting delete's
// snapshot. The delete must nevertheless wait for the insert's lock and then
// see the committed book, not delete the author out from under it.
#[sqlx::test(migrator = "books_api::postgres::MIGRATOR")]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn delete_waits_for_in_flight_book_insert(pool: PgPool) {
    let repo = Postgres::with_pool(pool.clone());
    let author_id = insert_author(&repo, "Emily", "Bronte").await;

    // Run the guarded insert inside an open transaction so its author row
    // lock is held across the delete below.
    let mut tx = pool.begin().await.unwrap();
    let book_id = Uuid::new_v4();
    let inserted = sqlx::query(
        "INSERT INTO books (id, author_id, title, publish_date)
         SELECT $1, $2, $3, $4
         WHERE EXISTS (SELECT 1 FROM authors AS a WHERE a.id = $2 FOR UPDATE)",
    )
    .bind(book_id)
    .bind(author_id)
    .bind("Wuthering Heights")
    .bind(date("1847-12-01"))
    .execute(&mut *tx)
    .await
    .unwrap();
    assert_eq!(inserted.rows_affected(), 1);

    let deleter = {
        let repo = repo.clone();
        tokio::spawn(async move { repo.delete_author(author_id).await })
    };
    // Give the delete time to reach the author row lock and block on it.
    tokio::time::sleep(Duration::from_millis(200)).await;
    tx.commit().await.unwrap();

    let result = deleter.await.unwrap();
    assert!(matches!(result, Err(DeleteAuthorError::HasBooks { id }) if id == author_id));
    assert!(repo.author_by_id(author_id).await.is_ok());
    assert_eq!(repo.books_by_author(author_id).await.unwrap().len(), 1);
}

// Hammers the insert/delete pair touching one author. Whatever the
// interleaving, the end state must never show a referencing book without its
// author: either the delete saw books and failed, or the inserts saw the
// author gone and failed.
#[sqlx::test(migrator = "books_api::postgres::MIGRATOR")]
#[ignore = "requires a running Postgres (set DATABASE_URL)"]
async fn concurrent_insert_and_delete_never_orphan(pool: PgPool) {
    let repo = Postgres::with_pool(pool);

    for round in 0..20 {
        let author_id = insert_author(&repo, "Race", "Condition").await;

        let mut writers = Vec::new();
        for i in 0..8 {
            let repo = repo.clone();
            writers.push(tokio::spawn(async move {
                let req = CreateBookRequest::new(
                    title(&format!("Round {round} book {i}")),
                    author_id,
                    date("2000-01-01"),
                );
                repo.create_book(&req).await
            }));
        }
        let deleter = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.delete_author(author_id).await })
        };

        let mut inserted = 0;
        for writer in writers {
            if writer.await.unwrap().is_ok() {
                inserted += 1;
            }
        }
        let deleted = deleter.await.unwrap().is_ok();

        let author_present = repo.author_by_id(author_id).await.is_ok();
        let books = repo.books_by_author(author_id).await.unwrap();

        assert_eq!(author_present, !deleted);
        if deleted {
            assert_eq!(inserted, 0, "delete succeeded past committed book inserts");
        }
        assert!(
            author_present || books.is_empty(),
            "orphan books visible after author delete"
        );
        assert_eq!(books.len(), inserted);

        for book in books {
            repo.delete_book(book.id()).await.unwrap();
        }
        if author_present {
            repo.delete_author(author_id).await.unwrap();
        }
    }
}
