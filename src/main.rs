use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use quickyelp::config::{FetchMode, PipelineConfig};
use quickyelp::pipeline::Pipeline;

#[derive(Parser)]
#[command(
    name = "quickyelp",
    about = "Scrape a Yelp business into QA-ready fact and review corpora"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Fetch review pages concurrently instead of one at a time
    #[arg(long, global = true)]
    concurrent: bool,

    /// Politeness delay between page requests, in milliseconds
    #[arg(long, global = true, default_value = "1000")]
    delay_ms: u64,

    /// Write raw pages, extracted JSON and the final record here
    #[arg(long, global = true, value_name = "DIR")]
    dump_dir: Option<PathBuf>,

    /// Where the two corpus files are written
    #[arg(short = 'o', long, global = true, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a business-page URL and its review pages
    Scrape {
        /// Yelp business URL (desktop, m.yelp.com, or yelp.to short link)
        url: String,
        /// Review pages to scrape (max 5)
        #[arg(short = 'n', long, default_value = "1", value_parser = clap::value_parser!(u8).range(0..=5))]
        pages: u8,
    },
    /// Find a business by name and location via the Fusion API, then scrape it
    Search { name: String, location: String },
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

    let config = PipelineConfig {
        fetch_mode: if cli.concurrent {
            FetchMode::Concurrent
        } else {
            FetchMode::Sequential
        },
        request_delay: Duration::from_millis(cli.delay_ms),
        fusion_api_key: std::env::var("YELP_FUSION_KEY").ok(),
        dump_dir: cli.dump_dir,
        ..Default::default()
    };
    let pipeline = Pipeline::new(config)?;

    let retrieval = match cli.command {
        Commands::Scrape { url, pages } => pipeline.scrape_url(&url, pages as usize).await?,
        Commands::Search { name, location } => pipeline.search(&name, &location).await?,
    };

    println!("{}", retrieval.summary);
    println!(
        "Pages: {} ok, {} failed. Reviews: {}.",
        retrieval.pages_ok,
        retrieval.pages_failed,
        retrieval.reviews.total()
    );

    std::fs::create_dir_all(&cli.out_dir)?;
    let info_path = cli.out_dir.join("business_information.txt");
    let reviews_path = cli.out_dir.join("business_reviews.txt");
    std::fs::write(&info_path, &retrieval.corpus.business_info)?;
    std::fs::write(&reviews_path, &retrieval.corpus.reviews)?;
    println!(
        "Wrote {} and {}",
        info_path.display(),
        reviews_path.display()
    );

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("Done in {:.1}s", elapsed.as_secs_f64());
    }

    Ok(())
}
