// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::{EnvFilter, fmt};

use podshelf::{
    BatchReport, ConfigStore, Configuration, Downloader, NoopReporter, ProgressEvent,
    ProgressReporter, ReqwestClient, RssFeedSource, SharedProgressReporter, SqliteStore,
    SyncEngine, TomlFileStore,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static RETRY: Emoji<'_, '_> = Emoji("🔁 ", "[r] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// Human-editable TOML file
    Toml,
    /// SQLite database
    Sqlite,
}

/// Keep local podcast folders in sync with their feeds
#[derive(Parser, Debug)]
#[command(name = "podshelf")]
#[command(about = "Keep local podcast folders in sync with their feeds")]
#[command(version)]
struct Args {
    /// Configuration file; relative podcast directories resolve against its folder
    #[arg(short, long, default_value = "podshelf.toml")]
    config: PathBuf,

    /// Storage format of the configuration file
    #[arg(short, long, value_enum, default_value_t = Backend::Toml)]
    backend: Backend,

    /// Write an empty configuration if none exists, then exit
    #[arg(long)]
    init: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Progress reporter using indicatif for terminal output.
///
/// Downloads run one at a time, so a single bar is reused for each.
struct IndicatifReporter {
    multi: MultiProgress,
    download_bar: Mutex<Option<ProgressBar>>,
    main_bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Result<Self> {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar().template("{spinner:.green} {wide_msg}")?;

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Ok(Self {
            multi,
            download_bar: Mutex::new(None),
            main_bar,
        })
    }

    fn download_bar(&self) -> ProgressBar {
        let mut slot = self.download_bar.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(bar) = slot.as_ref() {
            return bar.clone();
        }

        let bar = self.multi.add(ProgressBar::new(0));
        if let Ok(style) = ProgressStyle::default_bar().template(&format!(
            "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
        )) {
            bar.set_style(style.progress_chars("█▓░"));
        }
        *slot = Some(bar.clone());
        bar
    }

    fn finish_download_bar(&self) {
        let mut slot = self.download_bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = slot.take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingFeed { label, url } => {
                self.main_bar.set_message(format!(
                    "{SEARCH}{} Fetching feed: {}",
                    label.bold(),
                    url.cyan()
                ));
            }

            ProgressEvent::FeedMerged {
                podcast_title,
                total_episodes,
                new_episodes,
                ..
            } => {
                self.main_bar.set_message(format!(
                    "{HEADPHONES}{} • {} episodes tracked, {} new",
                    podcast_title.bold().green(),
                    total_episodes.to_string().cyan(),
                    new_episodes.to_string().yellow()
                ));
            }

            ProgressEvent::Reconciled {
                label,
                downloaded,
                newly_deleted,
                remaining,
            } => {
                let _ = self.multi.println(format!(
                    "{HEADPHONES}{}: {} on disk, {} removed since last sync, {} to fetch",
                    label.bold(),
                    downloaded.to_string().cyan(),
                    newly_deleted.to_string().yellow(),
                    remaining.to_string().green()
                ));
            }

            ProgressEvent::DownloadStarting {
                episode_title,
                episode_index,
                total_to_download,
                content_length,
            } => {
                let bar = self.download_bar();
                bar.set_length(content_length.unwrap_or(0));
                bar.set_position(0);
                bar.set_message(format!(
                    "[{}/{}] {}",
                    (episode_index + 1).to_string().cyan(),
                    total_to_download.to_string().cyan(),
                    truncate_title(&episode_title, 40)
                ));
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => {
                let bar = self.download_bar();
                if let Some(total) = total_bytes {
                    bar.set_length(total);
                }
                bar.set_position(bytes_downloaded);
            }

            ProgressEvent::DownloadRetrying {
                episode_title,
                attempt,
                error,
            } => {
                self.download_bar().set_message(format!(
                    "{RETRY}{} (attempt {} failed: {})",
                    truncate_title(&episode_title, 30).yellow(),
                    attempt,
                    error.dimmed()
                ));
            }

            ProgressEvent::DownloadCompleted {
                episode_title,
                bytes_downloaded,
            } => {
                let bar = self.download_bar();
                bar.set_position(bytes_downloaded);
                self.finish_download_bar();
                let _ = self.multi.println(format!(
                    "  {SUCCESS}{}",
                    truncate_title(&episode_title, 60).green()
                ));
            }

            ProgressEvent::DownloadFailed {
                episode_title,
                error,
            } => {
                self.finish_download_bar();
                let _ = self.multi.println(format!(
                    "  {FAILURE}{} - {}",
                    truncate_title(&episode_title, 30).red(),
                    error.red()
                ));
            }

            ProgressEvent::PodcastFailed { label, error } => {
                let _ = self.multi.println(format!(
                    "{FAILURE}{} skipped: {}",
                    label.bold().red(),
                    error.red()
                ));
            }

            ProgressEvent::PodcastCompleted {
                label,
                downloaded_count,
                failed_count,
                deleted_count,
            } => {
                let _ = self.multi.println(format!(
                    "{FOLDER}{}: {} downloaded, {} deleted, {} failed",
                    label.bold(),
                    downloaded_count.to_string().green().bold(),
                    deleted_count.to_string().yellow(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    }
                ));
            }
        }
    }
}

impl Drop for IndicatifReporter {
    fn drop(&mut self) {
        self.main_bar.finish_and_clear();
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let cut: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

fn open_store(args: &Args) -> Result<Box<dyn ConfigStore>> {
    let store: Box<dyn ConfigStore> = match args.backend {
        Backend::Toml => Box::new(TomlFileStore::new(&args.config)),
        Backend::Sqlite => Box::new(
            SqliteStore::open(&args.config)
                .with_context(|| format!("Failed to open {}", args.config.display()))?,
        ),
    };
    Ok(store)
}

fn init_config(args: &Args) -> Result<()> {
    let created = match args.backend {
        Backend::Toml => TomlFileStore::new(&args.config).init()?,
        Backend::Sqlite => {
            let store = SqliteStore::open(&args.config)?;
            if store.load()?.podcasts.is_empty() {
                store.save(&Configuration::default())?;
                true
            } else {
                false
            }
        }
    };

    if created {
        println!(
            "{SUCCESS}Created {}",
            args.config.display().to_string().cyan()
        );
    } else {
        println!(
            "{FOLDER}{} already exists, leaving it untouched",
            args.config.display().to_string().cyan()
        );
    }
    Ok(())
}

fn print_summary(report: &BatchReport) {
    let downloaded: usize = report.synced.iter().map(|r| r.downloaded).sum();
    let deleted: usize = report.synced.iter().map(|r| r.deleted).sum();
    let failed_downloads: usize = report.synced.iter().map(|r| r.failed.len()).sum();

    let failed_episodes: Vec<_> = report
        .synced
        .iter()
        .flat_map(|r| r.failed.iter().map(move |(guid, error)| (&r.label, guid, error)))
        .collect();
    if !failed_episodes.is_empty() {
        println!("\n{}", "Failed episodes:".red().bold());
        for (label, guid, error) in failed_episodes {
            println!(
                "  {}{} {} - {}",
                CROSS,
                label.bold(),
                guid.yellow(),
                error.dimmed()
            );
        }
    }

    if !report.failed.is_empty() {
        println!("\n{}", "Skipped podcasts:".red().bold());
        for (label, error) in &report.failed {
            println!(
                "  {}{} - {}",
                CROSS,
                label.yellow(),
                error.to_string().dimmed()
            );
        }
    }

    println!(
        "\n{PARTY}{} {} podcasts, {} downloaded, {} deleted, {} failed\n",
        "Sync complete:".bold().green(),
        report.synced.len().to_string().cyan(),
        downloaded.to_string().green().bold(),
        deleted.to_string().yellow(),
        if failed_downloads + report.failed.len() > 0 {
            (failed_downloads + report.failed.len()).to_string().red().bold()
        } else {
            "0".green()
        }
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "podshelf".bold().magenta(),
            "- Podcast Sync".dimmed()
        );
    }

    if args.init {
        return init_config(&args);
    }

    let store = open_store(&args)?;

    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new()?)
    };

    let client = Arc::new(ReqwestClient::new());
    let engine = SyncEngine::new(
        RssFeedSource::new(client.clone()),
        Downloader::new(client),
        reporter,
    );

    let report = engine
        .sync_all(store.as_ref())
        .await
        .with_context(|| format!("Failed to sync {}", args.config.display()))?;

    // Drop the engine to clear the progress spinner before the summary
    drop(engine);

    if !args.quiet {
        print_summary(&report);
    }

    Ok(())
}
