//! Batched loading of the normalized model into the SQLite sink.
//!
//! All seven target relations go through one `BatchWriter`: rows
//! accumulate until the configured batch size and each flush commits as
//! its own transaction, so a crash mid-load leaves at most one
//! partially-applied batch. Foreign-key enforcement is suspended for the
//! duration of the load because join rows can land before their parent
//! rows commit in a different batch.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::fmt::Display;

use crate::models::{AppData, LoadStats, Review};
use crate::progress::create_progress_bar;

const INSERT_APPS: &str =
    "INSERT INTO apps (id, name, category_id, price_type, content_rating) VALUES (?1, ?2, ?3, ?4, ?5)";
const INSERT_CATEGORIES: &str = "INSERT INTO categories (id, name) VALUES (?1, ?2)";
const INSERT_PRICE_TYPES: &str = "INSERT INTO price_types (id, name) VALUES (?1, ?2)";
const INSERT_CONTENT_RATINGS: &str = "INSERT INTO content_ratings (id, rating) VALUES (?1, ?2)";
const INSERT_GENRES: &str = "INSERT INTO genres (id, name) VALUES (?1, ?2)";
const INSERT_APPS_GENRES: &str = "INSERT INTO apps_genres (app_id, genre_id) VALUES (?1, ?2)";
const INSERT_REVIEWS: &str = "INSERT INTO reviews (id, app_id, review) VALUES (?1, ?2, ?3)";

/// Serialize a value for the sink: string form when present, NULL stays
/// NULL (never 0 or an empty string).
pub fn db_literal<T: Display>(value: Option<T>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// Fixed-size batched insert buffer for one target relation.
pub struct BatchWriter {
    sql: &'static str,
    batch_size: usize,
    pending: Vec<Vec<Option<String>>>,
    rows_written: usize,
    batches_committed: usize,
}

impl BatchWriter {
    pub fn new(sql: &'static str, batch_size: usize) -> Self {
        Self {
            sql,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            rows_written: 0,
            batches_committed: 0,
        }
    }

    /// Buffer one row, flushing once the pending batch reaches the
    /// configured size.
    pub fn append(&mut self, conn: &mut Connection, row: Vec<Option<String>>) -> Result<()> {
        self.pending.push(row);
        if self.pending.len() >= self.batch_size {
            self.flush(conn)?;
        }
        Ok(())
    }

    /// Write and commit the pending batch. An empty batch is a no-op.
    fn flush(&mut self, conn: &mut Connection) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(self.sql)?;
            for row in &self.pending {
                stmt.execute(rusqlite::params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        self.rows_written += self.pending.len();
        self.batches_committed += 1;
        self.pending.clear();
        Ok(())
    }

    /// Flush the final partial batch and return `(rows, batches)` written
    /// over the writer's lifetime.
    pub fn close(mut self, conn: &mut Connection) -> Result<(usize, usize)> {
        self.flush(conn)?;
        Ok((self.rows_written, self.batches_committed))
    }
}

/// Bulk-load tuning for the output connection.
pub fn prepare_sink(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;
         PRAGMA temp_store = MEMORY;",
    )?;
    Ok(())
}

/// Recreate the destination schema from scratch.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS reviews;
         DROP TABLE IF EXISTS apps_genres;
         DROP TABLE IF EXISTS apps;
         DROP TABLE IF EXISTS categories;
         DROP TABLE IF EXISTS price_types;
         DROP TABLE IF EXISTS content_ratings;
         DROP TABLE IF EXISTS genres;

         CREATE TABLE categories (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL
         );
         CREATE TABLE price_types (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL
         );
         CREATE TABLE content_ratings (
             id INTEGER PRIMARY KEY,
             rating TEXT NOT NULL
         );
         CREATE TABLE genres (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL
         );
         CREATE TABLE apps (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL UNIQUE,
             category_id INTEGER REFERENCES categories(id),
             price_type INTEGER REFERENCES price_types(id),
             content_rating INTEGER REFERENCES content_ratings(id)
         );
         CREATE TABLE apps_genres (
             app_id INTEGER NOT NULL REFERENCES apps(id),
             genre_id INTEGER NOT NULL REFERENCES genres(id)
         );
         CREATE TABLE reviews (
             id INTEGER PRIMARY KEY,
             app_id INTEGER NOT NULL REFERENCES apps(id),
             review TEXT NOT NULL
         );",
    )
    .context("Failed to create destination schema")
}

/// Suspend referential-integrity enforcement for the load. Rows are
/// written in an order that can transiently violate foreign keys.
pub fn disable_constraints(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", false)?;
    Ok(())
}

/// Re-enable enforcement and verify the loaded rows satisfy it.
///
/// SQLite does not re-validate existing rows when the pragma flips back
/// on, so a clean `foreign_key_check` is what proves the load left the
/// sink consistent.
pub fn enable_constraints(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    let violations: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_foreign_key_check()",
        [],
        |row| row.get(0),
    )?;
    if violations > 0 {
        bail!("Foreign key check failed after load: {violations} violating rows");
    }
    Ok(())
}

fn record(counts: (usize, usize), stats: &mut LoadStats) {
    stats.rows_written += counts.0;
    stats.batches_committed += counts.1;
}

fn load_lookup<T>(
    conn: &mut Connection,
    sql: &'static str,
    entities: &[T],
    to_row: impl Fn(&T) -> Vec<Option<String>>,
    batch_size: usize,
    stats: &mut LoadStats,
) -> Result<()> {
    let mut writer = BatchWriter::new(sql, batch_size);
    for entity in entities {
        writer.append(conn, to_row(entity))?;
    }
    record(writer.close(conn)?, stats);
    Ok(())
}

/// Load applications, their genre join rows, and the four lookup tables.
///
/// The apps and apps_genres buffers fill from the same pass over the
/// application collection and are closed together; the lookup tables
/// follow in fixed order.
pub fn load_app_data(
    conn: &mut Connection,
    data: &AppData,
    batch_size: usize,
    stats: &mut LoadStats,
) -> Result<()> {
    let pb = create_progress_bar(data.apps.len() as u64, "Phase 4: Writing apps");

    let mut apps = BatchWriter::new(INSERT_APPS, batch_size);
    let mut app_genres = BatchWriter::new(INSERT_APPS_GENRES, batch_size);
    for app in &data.apps {
        apps.append(
            conn,
            vec![
                db_literal(Some(app.id)),
                db_literal(Some(&app.name)),
                db_literal(app.category_id),
                db_literal(app.price_type_id),
                db_literal(app.content_rating_id),
            ],
        )?;
        for &genre_id in &app.genre_ids {
            app_genres.append(
                conn,
                vec![db_literal(Some(app.id)), db_literal(Some(genre_id))],
            )?;
        }
        pb.inc(1);
    }
    record(apps.close(conn)?, stats);
    record(app_genres.close(conn)?, stats);

    load_lookup(
        conn,
        INSERT_CATEGORIES,
        &data.categories,
        |c| vec![db_literal(Some(c.id)), db_literal(Some(&c.name))],
        batch_size,
        stats,
    )?;
    load_lookup(
        conn,
        INSERT_PRICE_TYPES,
        &data.price_types,
        |p| vec![db_literal(Some(p.id)), db_literal(Some(&p.name))],
        batch_size,
        stats,
    )?;
    load_lookup(
        conn,
        INSERT_CONTENT_RATINGS,
        &data.content_ratings,
        |r| vec![db_literal(Some(r.id)), db_literal(Some(&r.rating))],
        batch_size,
        stats,
    )?;
    load_lookup(
        conn,
        INSERT_GENRES,
        &data.genres,
        |g| vec![db_literal(Some(g.id)), db_literal(Some(&g.name))],
        batch_size,
        stats,
    )?;

    pb.finish_with_message(format!("Phase 4: Wrote {} apps", data.apps.len()));
    Ok(())
}

/// Load the review relation.
pub fn load_reviews(
    conn: &mut Connection,
    reviews: &[Review],
    batch_size: usize,
    stats: &mut LoadStats,
) -> Result<()> {
    let pb = create_progress_bar(reviews.len() as u64, "Phase 5: Writing reviews");

    let mut writer = BatchWriter::new(INSERT_REVIEWS, batch_size);
    for review in reviews {
        writer.append(
            conn,
            vec![
                db_literal(Some(review.id)),
                db_literal(review.app_id),
                db_literal(Some(&review.text)),
            ],
        )?;
        pb.inc(1);
    }
    record(writer.close(conn)?, stats);

    pb.finish_with_message(format!("Phase 5: Wrote {} reviews", reviews.len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract_apps, extract_reviews};
    use crate::intern::Interner;
    use crate::link::link_reviews;
    use crate::models::{RawAppRecord, RawReviewRecord};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    fn count(conn: &Connection, table: &str) -> usize {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let n: i64 = conn.query_row(&sql, [], |row| row.get(0)).unwrap();
        n as usize
    }

    #[test]
    fn test_db_literal() {
        assert_eq!(db_literal(Some(7i64)), Some("7".to_string()));
        assert_eq!(db_literal(Some("Free")), Some("Free".to_string()));
        assert_eq!(db_literal::<i64>(None), None);
    }

    #[test]
    fn test_batch_flush_completeness() {
        // N rows with batch size B land as exactly N rows in ceil(N/B)
        // batches, the last one partial.
        let mut conn = test_conn();
        for (n, b) in [(10usize, 3usize), (9, 3), (1, 5), (0, 4), (4, 1)] {
            conn.execute("DELETE FROM genres", []).unwrap();
            let mut writer = BatchWriter::new(INSERT_GENRES, b);
            for i in 0..n {
                writer
                    .append(
                        &mut conn,
                        vec![db_literal(Some(i as i64)), Some(format!("genre {i}"))],
                    )
                    .unwrap();
            }
            let (rows, batches) = writer.close(&mut conn).unwrap();
            assert_eq!(rows, n);
            assert_eq!(batches, n.div_ceil(b));
            assert_eq!(count(&conn, "genres"), n);
        }
    }

    #[test]
    fn test_close_on_empty_writer_is_noop() {
        let mut conn = test_conn();
        let writer = BatchWriter::new(INSERT_GENRES, 8);
        let (rows, batches) = writer.close(&mut conn).unwrap();
        assert_eq!((rows, batches), (0, 0));
    }

    #[test]
    fn test_null_attributes_stay_null() {
        let mut conn = test_conn();
        let mut stats = LoadStats::default();
        let data = AppData {
            apps: vec![crate::models::Application {
                id: 0,
                name: "X".to_string(),
                category_id: None,
                price_type_id: None,
                content_rating_id: None,
                genre_ids: Default::default(),
            }],
            ..Default::default()
        };
        load_app_data(&mut conn, &data, 16, &mut stats).unwrap();

        let nulls: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM apps
                 WHERE category_id IS NULL AND price_type IS NULL AND content_rating IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn test_constraint_toggle_allows_out_of_order_writes() {
        let mut conn = test_conn();
        disable_constraints(&conn).unwrap();

        // Join row lands before either parent exists.
        let mut links = BatchWriter::new(INSERT_APPS_GENRES, 1);
        links
            .append(&mut conn, vec![db_literal(Some(0)), db_literal(Some(0))])
            .unwrap();
        links.close(&mut conn).unwrap();

        conn.execute("INSERT INTO genres (id, name) VALUES (0, 'Action')", [])
            .unwrap();
        conn.execute("INSERT INTO apps (id, name) VALUES (0, 'X')", [])
            .unwrap();

        enable_constraints(&conn).unwrap();
    }

    #[test]
    fn test_enable_constraints_rejects_orphan_rows() {
        let conn = test_conn();
        disable_constraints(&conn).unwrap();
        conn.execute("INSERT INTO apps_genres (app_id, genre_id) VALUES (5, 9)", [])
            .unwrap();
        assert!(enable_constraints(&conn).is_err());
    }

    #[test]
    fn test_full_model_round_trip() {
        let field = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let app_rows = vec![
            RawAppRecord {
                app: field("X"),
                category: field("GAME_ACTION"),
                price_type: field("Free"),
                content_rating: field("Everyone"),
                genres: field("Action;Arcade"),
            },
            RawAppRecord {
                app: field("Y"),
                category: field("TOOLS"),
                price_type: field("Free"),
                content_rating: field("Everyone"),
                genres: field("Tools"),
            },
        ];
        let review_rows = vec![RawReviewRecord {
            app: field("X"),
            translated_review: field("Great game"),
        }];

        let mut categories = Interner::new();
        let mut price_types = Interner::new();
        let mut content_ratings = Interner::new();
        let mut genres = Interner::new();
        let mut apps = extract_apps(
            &app_rows,
            &mut categories,
            &mut price_types,
            &mut content_ratings,
            &mut genres,
        );
        let review_data = extract_reviews(&review_rows);
        let mut reviews = review_data.reviews;
        link_reviews(&mut apps, &mut reviews, &review_data.by_app);

        let data = AppData {
            apps,
            categories: categories.into_entities(),
            price_types: price_types.into_entities(),
            content_ratings: content_ratings.into_entities(),
            genres: genres.into_entities(),
        };

        let mut conn = test_conn();
        let mut stats = LoadStats::default();
        disable_constraints(&conn).unwrap();
        load_app_data(&mut conn, &data, 2, &mut stats).unwrap();
        load_reviews(&mut conn, &reviews, 2, &mut stats).unwrap();
        enable_constraints(&conn).unwrap();

        // Y had no review and was pruned; its lookup values stay.
        assert_eq!(count(&conn, "apps"), 1);
        assert_eq!(count(&conn, "categories"), 2);
        assert_eq!(count(&conn, "price_types"), 1);
        assert_eq!(count(&conn, "content_ratings"), 1);
        assert_eq!(count(&conn, "genres"), 3);
        assert_eq!(count(&conn, "apps_genres"), 2);
        assert_eq!(count(&conn, "reviews"), 1);
        assert_eq!(stats.rows_written, 1 + 2 + 2 + 1 + 1 + 3 + 1);

        let (app_id, review): (i64, String) = conn
            .query_row("SELECT app_id, review FROM reviews WHERE id = 0", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(app_id, 0);
        assert_eq!(review, "Great game");
    }
}
