//! Books catalog service: authors own zero or more books, and the
//! repositories keep that reference valid without a database foreign key.
//!
//! The schema has no `FOREIGN KEY` from `books.author_id` to `authors.id`.
//! Instead, every write that could break the reference serializes on the
//! referenced author row's lock: book inserts and updates are single guarded
//! statements whose `FOR UPDATE` subquery locks the author row, and the
//! author delete locks that row before checking for books. A concurrent
//! insert/delete pair touching the same author therefore serializes instead
//! of racing. See [`postgres`] for the statements themselves.

pub mod config;
pub mod http;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod repository;
