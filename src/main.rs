use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use shelf_scraper::config::{ConfigLoader, ConfigOverrides, OutputConfig, ShelfConfig};
use shelf_scraper::output;
use shelf_scraper::session::{SnapshotSession, WebDriverSession};
use shelf_scraper::{urls, BookRecord, ShelfScraper};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "shelf_scraper")]
#[command(version = "0.1.0")]
#[command(about = "Extracts a reading shelf from a book-cataloging profile", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a listing through a running WebDriver server
    Run {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listing URL or profile URL
        #[arg(short, long)]
        url: Option<String>,

        /// Shelf used when deriving the listing from a profile
        #[arg(short, long)]
        shelf: Option<String>,

        /// WebDriver endpoint, e.g. http://localhost:9515
        #[arg(short, long)]
        webdriver: Option<String>,

        /// Show the browser window
        #[arg(long)]
        no_headless: bool,

        /// Write results to a .json or .csv file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Extract books from saved page snapshots, in load order
    Extract {
        /// HTML files; each one is the page after one more load
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,

        /// Write results to a .json or .csv file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the listing URL for a profile or listing URL
    ShelfUrl {
        url: String,

        #[arg(short, long, default_value = urls::DEFAULT_SHELF)]
        shelf: String,
    },
}

fn output_from_path(path: &Path) -> anyhow::Result<OutputConfig> {
    let display = path.display().to_string();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(OutputConfig::Json { path: display }),
        Some("csv") => Ok(OutputConfig::Csv { path: display }),
        _ => anyhow::bail!("Unsupported output extension: {}", display),
    }
}

fn init_logging(multi: Option<&MultiProgress>) -> anyhow::Result<()> {
    let logger = env_logger::Builder::from_default_env().build();
    let level = logger.filter();
    match multi {
        Some(multi) => {
            indicatif_log_bridge::LogWrapper::new(multi.clone(), logger).try_init()?;
        }
        None => {
            log::set_boxed_logger(Box::new(logger))?;
        }
    }
    log::set_max_level(level);
    Ok(())
}

async fn emit(
    books: &[BookRecord],
    config: Option<&OutputConfig>,
    multi: Option<Arc<MultiProgress>>,
) -> anyhow::Result<()> {
    let mut handler = output::create_handler(config, multi)?;
    output::write_all(handler.as_mut(), books).await?;
    Ok(())
}

async fn run(config: ShelfConfig, progress: bool, multi: Arc<MultiProgress>) -> anyhow::Result<()> {
    let url = config.target_url()?;
    let scraper = ShelfScraper::new(&config);

    let progress_task = if progress {
        let pb = multi.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} books {msg}")?
                .progress_chars("#>-"),
        );
        let mut status_rx = scraper.watch_progress();
        Some(tokio::spawn(async move {
            while status_rx.changed().await.is_ok() {
                let status = *status_rx.borrow();
                pb.set_length(status.total as u64);
                pb.set_position(status.loaded as u64);
                if status.is_complete() {
                    pb.finish_with_message("loaded");
                }
            }
        }))
    } else {
        None
    };

    let session = WebDriverSession::connect(&config.webdriver_url, config.headless).await?;
    let result = scraper.scrape(session, url.as_str()).await;

    if let Some(task) = progress_task {
        task.abort();
    }
    let books = result?;

    let sink_multi = progress.then(|| multi.clone());
    emit(&books, config.output.as_ref(), sink_multi).await?;
    eprintln!("\n✅ Extracted {} books from {}", books.len(), url);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    let cli = Cli::parse();
    let multi = Arc::new(MultiProgress::new());

    match cli.command {
        Commands::Run {
            config,
            url,
            shelf,
            webdriver,
            no_headless,
            output,
            no_progress,
        } => {
            let progress = !no_progress;
            init_logging(progress.then_some(multi.as_ref()))?;

            let overrides = ConfigOverrides {
                url,
                shelf,
                webdriver_url: webdriver,
                headless: no_headless.then_some(false),
                output: output.as_deref().map(output_from_path).transpose()?,
            };
            if let Some(path) = &config {
                log::info!("Loading config from {:?}", path);
            }
            let config_data = ConfigLoader::resolve(config.as_deref(), &overrides)?;

            run(config_data, progress, multi).await?;
        }
        Commands::Extract { snapshots, output } => {
            init_logging(None)?;

            let session = SnapshotSession::from_files(snapshots.as_slice())?;
            let config = ShelfConfig::default();
            let scraper = ShelfScraper::new(&config);
            let source = format!("file://{}", snapshots[0].display());
            let books = scraper.scrape(session, &source).await?;

            let output = output.as_deref().map(output_from_path).transpose()?;
            emit(&books, output.as_ref(), None).await?;
            eprintln!("✅ Extracted {} books from {} snapshot(s)", books.len(), snapshots.len());
        }
        Commands::Check { config } => match ConfigLoader::load(&config) {
            Ok(cfg) => {
                println!("✅ Config is valid:");
                match cfg.target_url() {
                    Ok(url) => println!("   Target: {}", url),
                    Err(e) => println!("   Target: invalid ({})", e),
                }
                println!("   WebDriver: {}", cfg.webdriver_url);
                println!("   Max load requests: {}", cfg.max_load_requests);
            }
            Err(e) => {
                eprintln!("❌ Config error: {}", e);
                std::process::exit(1);
            }
        },
        Commands::ShelfUrl { url, shelf } => {
            println!("{}", urls::resolve_target(&url, &shelf)?);
        }
    }

    Ok(())
}
