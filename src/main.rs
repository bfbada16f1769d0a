mod download;
mod export;
mod fetch;
mod parser;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::warn;

use parser::{ListingProfile, Record};

const CONCURRENCY: usize = 10;

#[derive(Parser)]
#[command(name = "animal_scraper", about = "Collateral-adjective scraper for Wikipedia's animal list")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the listing page and print the resolved records
    Scrape {
        /// Also resolve per-animal page URLs
        #[arg(long)]
        extended: bool,
        /// Print records as JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Max records to display (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Resolve the image URL of a single animal page
    Page {
        /// Animal page URL
        url: String,
    },
    /// Full pipeline: listing -> per-animal images -> HTML report
    Run {
        /// Max records to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Directory for downloaded images
        #[arg(long, default_value = "data/images")]
        images: PathBuf,
        /// Report output path
        #[arg(long, default_value = "animal_list.html")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape { extended, json, limit } => {
            let client = fetch::client()?;
            println!("Fetching {}...", fetch::ANIMAL_LIST_URL);
            let page = fetch::fetch_page(&client, fetch::ANIMAL_LIST_URL).await?;
            let mut records = parser::resolve_records(&page, &ListingProfile::default(), extended)?;
            if let Some(n) = limit {
                records.truncate(n);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_records(&records, extended);
            }
            Ok(())
        }
        Commands::Page { url } => {
            let client = fetch::client()?;
            let page = fetch::fetch_page(&client, &url).await?;
            match parser::detail::extract_image_url(&page) {
                Some(image) => println!("{}", image),
                None => println!("No image found on {}", url),
            }
            Ok(())
        }
        Commands::Run { limit, images, out } => {
            let client = fetch::client()?;
            println!("Fetching {}...", fetch::ANIMAL_LIST_URL);
            let page = fetch::fetch_page(&client, fetch::ANIMAL_LIST_URL).await?;
            let mut records = parser::resolve_records(&page, &ListingProfile::default(), true)?;
            if let Some(n) = limit {
                records.truncate(n);
            }

            println!("Resolved {} animals, collecting images...", records.len());
            let stats = collect_images(&client, &mut records, &images).await?;
            println!(
                "Images: {} ok, {} without an image, {} errors (of {}).",
                stats.ok, stats.missing, stats.errors, stats.total
            );

            export::write_report(&records, &out)?;
            println!("HTML file created: {}", out.display());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Image stats returned after the pipeline pass.
struct ImageStats {
    total: usize,
    ok: usize,
    missing: usize,
    errors: usize,
}

struct ImageOutcome {
    index: usize,
    image: Option<String>,
    error: Option<String>,
}

/// Fetch every record's page concurrently, pull its image, store a local
/// copy, and attach the path as results stream in. Per-record failures are
/// counted, never fatal.
async fn collect_images(
    client: &reqwest::Client,
    records: &mut [Record],
    dir: &Path,
) -> anyhow::Result<ImageStats> {
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let total = records.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send outcomes, main loop attaches them to records
    let (tx, mut rx) = tokio::sync::mpsc::channel::<ImageOutcome>(CONCURRENCY * 2);

    for (index, record) in records.iter().enumerate() {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        let name = record.name.clone();
        let page_url = record.page_url.clone();
        let dir = dir.to_path_buf();

        tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let outcome = match fetch_one_image(&client, &name, page_url.as_deref(), &dir).await {
                Ok(image) => ImageOutcome {
                    index,
                    image,
                    error: None,
                },
                Err(e) => {
                    warn!("Image task failed for {}: {}", name, e);
                    ImageOutcome {
                        index,
                        image: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            let _ = tx.send(outcome).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut ok = 0usize;
    let mut missing = 0usize;
    let mut errors = 0usize;

    while let Some(outcome) = rx.recv().await {
        match (&outcome.image, &outcome.error) {
            (Some(_), _) => ok += 1,
            (None, None) => missing += 1,
            (None, Some(_)) => errors += 1,
        }
        records[outcome.index].image = outcome.image;
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(ImageStats {
        total,
        ok,
        missing,
        errors,
    })
}

/// Page fetch, image extraction, and download for one record. `Ok(None)`
/// means the page has no usable image.
async fn fetch_one_image(
    client: &reqwest::Client,
    name: &str,
    page_url: Option<&str>,
    dir: &Path,
) -> anyhow::Result<Option<String>> {
    let Some(page_url) = page_url else {
        anyhow::bail!("no page URL");
    };
    let page = fetch::fetch_page(client, page_url).await?;
    let Some(image_url) = parser::detail::extract_image_url(&page) else {
        return Ok(None);
    };
    let path = download::save_image(client, &image_url, dir, name).await?;
    Ok(Some(path.display().to_string()))
}

fn print_records(records: &[Record], extended: bool) {
    if extended {
        println!(
            "{:>4} | {:<20} | {:<36} | {:<40}",
            "#", "Animal", "Collateral adjectives", "Page"
        );
        println!("{}", "-".repeat(110));
    } else {
        println!("{:>4} | {:<20} | {:<40}", "#", "Animal", "Collateral adjectives");
        println!("{}", "-".repeat(69));
    }

    for (i, r) in records.iter().enumerate() {
        let name = truncate(&r.name, 20);
        let adjectives = r
            .adjectives
            .as_ref()
            .map(|a| a.join(", "))
            .unwrap_or_else(|| "-".to_string());

        if extended {
            let page = r.page_url.as_deref().unwrap_or("-");
            println!(
                "{:>4} | {:<20} | {:<36} | {:<40}",
                i + 1,
                name,
                truncate(&adjectives, 36),
                page
            );
        } else {
            println!("{:>4} | {:<20} | {:<40}", i + 1, name, truncate(&adjectives, 40));
        }
    }

    println!("\n{} animals", records.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
