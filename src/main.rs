use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Instant;

use playstore_loader::config::resolve_batch_size;
use playstore_loader::extract::{extract_apps, extract_reviews};
use playstore_loader::intern::Interner;
use playstore_loader::link::link_reviews;
use playstore_loader::load::{
    create_schema, disable_constraints, enable_constraints, load_app_data, load_reviews,
    prepare_sink,
};
use playstore_loader::models::{AppData, LoadStats, RawAppRecord, RawReviewRecord, ReviewData};
use playstore_loader::progress::create_spinner;
use playstore_loader::reader::read_rows;
use playstore_loader::safety::validate_output_path;

// File names inside the dataset folder.
// Dataset: https://www.kaggle.com/lava18/google-play-store-apps/
const APPS_CSV: &str = "googleplaystore.csv";
const REVIEWS_CSV: &str = "googleplaystore_user_reviews.csv";

#[derive(Parser)]
#[command(name = "playstore-loader")]
#[command(about = "Normalize the Google Play Store dataset and bulk-load it into SQLite")]
struct Args {
    /// Path to the extracted Google Play Store dataset folder
    dataset_dir: PathBuf,

    /// Output database, recreated from scratch on every run
    output: PathBuf,

    /// Config file holding the batch size (default: loader_config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Batch size override; takes precedence over the config file
    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Write run statistics to this path as JSON
    #[arg(long)]
    stats: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let batch_size = resolve_batch_size(args.batch_size, args.config.as_deref())?;

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let start = Instant::now();
    let mut stats = LoadStats::default();

    let apps_path = args.dataset_dir.join(APPS_CSV);
    let reviews_path = args.dataset_dir.join(REVIEWS_CSV);
    validate_output_path(&args.output, &[&apps_path, &reviews_path])?;

    let spinner = create_spinner("Phase 1: Reading dataset");
    let app_rows = read_rows::<RawAppRecord>(&apps_path)?;
    let review_rows = read_rows::<RawReviewRecord>(&reviews_path)?;
    spinner.finish_with_message(format!(
        "Phase 1: Read {} app rows, {} review rows ({} exact duplicates dropped)",
        app_rows.rows.len(),
        review_rows.rows.len(),
        app_rows.duplicates + review_rows.duplicates
    ));
    stats.app_rows_read = app_rows.rows.len();
    stats.app_rows_duplicate = app_rows.duplicates;
    stats.app_rows_malformed = app_rows.malformed;
    stats.review_rows_read = review_rows.rows.len();
    stats.review_rows_duplicate = review_rows.duplicates;
    stats.review_rows_malformed = review_rows.malformed;

    // The two normalization passes share no mutable state; the linker
    // needs both complete collections, so it waits on the join.
    let spinner = create_spinner("Phase 2: Normalizing");
    let mut categories = Interner::new();
    let mut price_types = Interner::new();
    let mut content_ratings = Interner::new();
    let mut genres = Interner::new();
    let (apps, review_data) = rayon::join(
        || {
            extract_apps(
                &app_rows.rows,
                &mut categories,
                &mut price_types,
                &mut content_ratings,
                &mut genres,
            )
        },
        || extract_reviews(&review_rows.rows),
    );
    let mut data = AppData {
        apps,
        categories: categories.into_entities(),
        price_types: price_types.into_entities(),
        content_ratings: content_ratings.into_entities(),
        genres: genres.into_entities(),
    };
    let ReviewData { mut reviews, by_app } = review_data;
    spinner.finish_with_message(format!(
        "Phase 2: {} apps ({} categories, {} genres), {} reviews",
        data.apps.len(),
        data.categories.len(),
        data.genres.len(),
        reviews.len()
    ));
    stats.apps_extracted = data.apps.len();
    stats.categories = data.categories.len();
    stats.price_types = data.price_types.len();
    stats.content_ratings = data.content_ratings.len();
    stats.genres = data.genres.len();
    stats.reviews_extracted = reviews.len();

    let spinner = create_spinner("Phase 3: Linking reviews to apps");
    let outcome = link_reviews(&mut data.apps, &mut reviews, &by_app);
    spinner.finish_with_message(format!(
        "Phase 3: Linked {} reviews (pruned {} apps, {} reviews)",
        reviews.len(),
        outcome.apps_pruned,
        outcome.reviews_pruned
    ));
    stats.apps_pruned = outcome.apps_pruned;
    stats.reviews_pruned = outcome.reviews_pruned;

    if args.output.exists() {
        std::fs::remove_file(&args.output).context("Failed to remove existing output file")?;
    }
    println!("Creating output database: {:?}", args.output);
    let mut conn =
        Connection::open(&args.output).context("Failed to create output database")?;
    prepare_sink(&conn)?;
    create_schema(&conn)?;

    disable_constraints(&conn)?;
    load_app_data(&mut conn, &data, batch_size, &mut stats)?;
    load_reviews(&mut conn, &reviews, batch_size, &mut stats)?;
    enable_constraints(&conn)?;

    stats.elapsed_seconds = start.elapsed().as_secs_f64();

    println!("\n{:=<60}", "");
    println!("Load complete!");
    println!("  Apps: {}", data.apps.len());
    println!("  Reviews: {}", reviews.len());
    println!("  Rows written: {}", stats.rows_written);
    println!("  Batches committed: {}", stats.batches_committed);
    println!("  Elapsed: {:.2}s", stats.elapsed_seconds);
    println!("{:=<60}", "");

    if let Some(path) = args.stats {
        stats.write_to_file(&path)?;
        println!("Stats written to {:?}", path);
    }

    Ok(())
}
