//! # CLI Module
//!
//! Command-line interface for the duplicate image finder.
//!
//! ## Usage
//! ```bash
//! # Scan directories for exact duplicates
//! pixel-dedup scan ~/Pictures ~/Downloads
//!
//! # JSON output
//! pixel-dedup scan ~/Pictures --output json
//!
//! # Step through each group and delete extra copies (to the trash)
//! pixel-dedup review ~/Pictures --trash
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use pixel_dedup::core::review::{
    FileRemover, GroupView, PermanentRemover, ReviewConfig, ReviewSession, TrashRemover,
};
use pixel_dedup::core::scanner::{CancellationToken, ScanOutcome, Scanner};
use pixel_dedup::core::ReportStatus;
use pixel_dedup::error::{DedupError, Result};
use pixel_dedup::events::{Event, EventChannel, FingerprintEvent, ReviewEvent, ScanEvent};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// pixel-dedup - Find images with identical pixels
#[derive(Parser, Debug)]
#[command(name = "pixel-dedup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan directories and report duplicate images
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
    /// Scan, then review each duplicate group and delete extra copies
    Review {
        #[command(flatten)]
        scan: ScanArgs,

        /// Move deleted files to the trash instead of removing them
        #[arg(long)]
        trash: bool,

        /// Largest preview edge in pixels
        #[arg(long, default_value = "400")]
        preview_size: u32,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Directories to scan
    paths: Vec<PathBuf>,

    /// Fingerprint worker threads (default: one per core)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Skip hidden files and directories
    #[arg(long)]
    skip_hidden: bool,

    /// Follow symbolic links
    #[arg(long)]
    follow_symlinks: bool,

    /// Maximum directory depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Only consider these extensions (comma separated)
    #[arg(long, value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Compare only the first N bytes of each fingerprint (1-32)
    #[arg(long)]
    key_bytes: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (the plain report)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { scan, output } => {
            pixel_dedup::init_tracing(log_filter(scan.verbose));
            run_scan(scan, output)
        }
        Commands::Review {
            scan,
            trash,
            preview_size,
        } => {
            pixel_dedup::init_tracing(log_filter(scan.verbose));
            run_review(scan, trash, preview_size)
        }
    }
}

fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "pixel_dedup=debug"
    } else {
        "pixel_dedup=warn"
    }
}

fn run_scan(args: ScanArgs, output: OutputFormat) -> Result<()> {
    let term = Term::stderr();
    let pretty = output == OutputFormat::Pretty;

    if pretty {
        print_header(&term);
    }

    let outcome = scan(&args, pretty)?;

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &outcome, args.verbose),
        OutputFormat::Json => print_json_results(&outcome)?,
        OutputFormat::Minimal => print!("{}", outcome.report()),
    }

    Ok(())
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("pixel-dedup").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

/// Run a scan with a progress bar and Ctrl-C cancellation.
///
/// Pixels are not kept; review previews decode on demand.
fn scan(args: &ScanArgs, show_progress: bool) -> Result<ScanOutcome> {
    let mut builder = Scanner::builder()
        .include_hidden(!args.skip_hidden)
        .follow_symlinks(args.follow_symlinks)
        .retain_pixels(false);
    if let Some(threads) = args.threads {
        builder = builder.threads(threads);
    }
    if let Some(depth) = args.max_depth {
        builder = builder.max_depth(depth);
    }
    if let Some(ref extensions) = args.extensions {
        builder = builder.extensions(extensions.clone());
    }
    if let Some(bytes) = args.key_bytes {
        builder = builder.key_bytes(bytes);
    }

    let token = CancellationToken::new();
    let scanner = builder.cancellation(token.clone()).build()?;
    let scanning = Arc::new(AtomicBool::new(true));
    install_interrupt_handler(token, Arc::clone(&scanning));

    let (sender, receiver) = EventChannel::new();

    let progress = if show_progress {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| DedupError::Config(e.to_string()))?
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = args.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Scan(ScanEvent::FileQueued { discovered, .. }) => {
                    pb.set_length(discovered as u64);
                }
                Event::Scan(ScanEvent::TraversalFinished { discovered }) => {
                    pb.set_length(discovered as u64);
                }
                Event::Fingerprint(FingerprintEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    if verbose {
                        pb.set_message(
                            p.current_path
                                .file_name()
                                .unwrap_or_default()
                                .to_string_lossy()
                                .into_owned(),
                        );
                    }
                }
                Event::Scan(ScanEvent::Cancelled) => {
                    pb.set_message("cancelled");
                }
                Event::Scan(ScanEvent::Completed(_)) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = scanner.scan_with_events(&args.paths, &sender);
    scanning.store(false, Ordering::SeqCst);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    Ok(result?)
}

/// First Ctrl-C during a scan cancels it; any other Ctrl-C exits
fn install_interrupt_handler(token: CancellationToken, scanning: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        if scanning.load(Ordering::SeqCst) && !token.is_cancelled() {
            token.cancel();
        } else {
            std::process::exit(130);
        }
    });

    if let Err(error) = result {
        warn!(%error, "could not install Ctrl-C handler");
    }
}

fn print_pretty_results(term: &Term, outcome: &ScanOutcome, verbose: bool) {
    let report = outcome.report();

    if outcome.cancelled {
        term.write_line(&format!(
            "{} Scan cancelled, showing partial results",
            style("!").yellow().bold()
        ))
        .ok();
    } else {
        term.write_line(&format!("{} Scan Complete", style("✓").green().bold()))
            .ok();
    }
    term.write_line("").ok();

    if report.status != ReportStatus::NoDirectoriesSelected {
        term.write_line(&format!(
            "  {} images indexed in {:.1}s",
            style(outcome.files_fingerprinted).cyan(),
            outcome.duration_ms as f64 / 1000.0
        ))
        .ok();
        term.write_line(&format!(
            "  {} files skipped (not decodable)",
            style(outcome.failures.len()).cyan()
        ))
        .ok();
        term.write_line(&format!(
            "  {} redundant copies",
            style(report.redundant_files()).cyan()
        ))
        .ok();
        term.write_line("").ok();
    }

    for error in &outcome.errors {
        term.write_line(&format!("  {} {}", style("⚠").yellow(), error))
            .ok();
    }

    if verbose {
        for failure in &outcome.failures {
            term.write_line(&format!(
                "  {} {}: {}",
                style("·").dim(),
                display_path(&failure.path),
                style(&failure.message).dim()
            ))
            .ok();
        }
    }

    match report.status {
        ReportStatus::DuplicatesFound { .. } => {
            term.write_line(&format!("{}", style(report.status).bold().underlined()))
                .ok();
            term.write_line("").ok();

            for (i, group) in report.groups.iter().enumerate() {
                term.write_line(&format!(
                    "  {} ({} images)",
                    style(format!("Group {}:", i + 1)).bold(),
                    group.paths.len()
                ))
                .ok();
                for path in &group.paths {
                    term.write_line(&format!("    {} {}", style("○").dim(), display_path(path)))
                        .ok();
                }
                if verbose {
                    term.write_line(&format!(
                        "    {} {}",
                        style("fingerprint").dim(),
                        style(&group.fingerprint).dim()
                    ))
                    .ok();
                }
                term.write_line("").ok();
            }

            term.write_line(&format!(
                "{}",
                style("No files were deleted. Run `pixel-dedup review` to clean up.").dim()
            ))
            .ok();
        }
        status => {
            term.write_line(&format!("  {}", style(status).green())).ok();
        }
    }
}

fn print_json_results(outcome: &ScanOutcome) -> Result<()> {
    let output = serde_json::json!({
        "report": outcome.report(),
        "files_discovered": outcome.files_discovered,
        "files_fingerprinted": outcome.files_fingerprinted,
        "failures": outcome.failures,
        "errors": outcome.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        "cancelled": outcome.cancelled,
        "duration_ms": outcome.duration_ms,
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&output).map_err(io::Error::from)?
    );
    Ok(())
}

fn run_review(args: ScanArgs, trash: bool, preview_size: u32) -> Result<()> {
    let term = Term::stderr();
    print_header(&term);

    let outcome = scan(&args, true)?;
    if outcome.cancelled {
        term.write_line(&format!(
            "{} Scan cancelled, reviewing partial results",
            style("!").yellow().bold()
        ))
        .ok();
    }

    let remover: Box<dyn FileRemover> = if trash {
        Box::new(TrashRemover)
    } else {
        Box::new(PermanentRemover)
    };
    let config = ReviewConfig {
        rendition_max: (preview_size.max(1), preview_size.max(1)),
    };

    let (sender, receiver) = EventChannel::new();
    let session = ReviewSession::from_outcome(outcome, config, remover).with_events(sender);

    let input = Term::stdout();
    let mut skipped = HashSet::new();

    loop {
        // Re-read after every change; deletes may resolve groups
        let groups = session.list_duplicates()?;
        let Some(group) = groups
            .into_iter()
            .find(|g| !skipped.contains(&g.fingerprint))
        else {
            break;
        };

        print_group(&term, &session, &group);
        term.write_line(&format!(
            "  {}",
            style("Delete which? (numbers, comma separated; Enter skips, q quits)").dim()
        ))
        .ok();

        let line = input.read_line()?;
        let answer = line.trim();
        if answer.eq_ignore_ascii_case("q") {
            break;
        }

        let picks = parse_picks(answer, group.members.len());
        if picks.is_empty() {
            skipped.insert(group.fingerprint);
            continue;
        }

        if picks.len() == group.members.len() {
            term.write_line(&format!(
                "  {} this deletes every copy",
                style("!").yellow().bold()
            ))
            .ok();
        }

        for pick in picks {
            let path = &group.members[pick].path;
            match session.delete(path) {
                Ok(deleted) => {
                    term.write_line(&format!(
                        "  {} {} ({} left in group)",
                        style("✗").red(),
                        display_path(&deleted.path),
                        deleted.remaining
                    ))
                    .ok();
                }
                Err(error) => {
                    term.write_line(&format!("  {} {}", style("⚠").yellow(), error))
                        .ok();
                }
            }
        }

        for event in receiver.drain() {
            if let Event::Review(ReviewEvent::GroupResolved { fingerprint }) = event {
                debug!(%fingerprint, "group resolved");
            }
        }
        term.write_line("").ok();
    }

    term.write_line("").ok();
    print!("{}", session.report()?);
    Ok(())
}

fn print_group(term: &Term, session: &ReviewSession, group: &GroupView) {
    term.write_line(&format!(
        "{} {}",
        style("Group").bold(),
        style(group.fingerprint.to_hex().chars().take(16).collect::<String>()).dim()
    ))
    .ok();

    for (i, member) in group.members.iter().enumerate() {
        let preview = match session.get_rendition(&member.path) {
            Ok(rendition) => format!("preview {}x{}", rendition.width, rendition.height),
            Err(error) => {
                debug!(%error, "no preview");
                "no preview".to_string()
            }
        };

        term.write_line(&format!(
            "  {} {}  {}",
            style(format!("[{}]", i + 1)).cyan(),
            display_path(&member.path),
            style(format!(
                "{}x{}, {}",
                member.dimensions.0, member.dimensions.1, preview
            ))
            .dim()
        ))
        .ok();
    }
}

/// 1-based picks from a comma separated answer; out of range picks are dropped
fn parse_picks(answer: &str, members: usize) -> Vec<usize> {
    let mut picks: Vec<usize> = answer
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|s| s.parse::<usize>().ok())
        .filter(|&n| n >= 1 && n <= members)
        .map(|n| n - 1)
        .collect();
    picks.sort_unstable();
    picks.dedup();
    picks
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir() {
        Some(home) => match path.strip_prefix(&home) {
            Ok(rest) => format!("~/{}", rest.display()),
            Err(_) => path.display().to_string(),
        },
        None => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_are_one_based_and_deduplicated() {
        assert_eq!(parse_picks("2, 1 2", 3), vec![0, 1]);
    }

    #[test]
    fn out_of_range_picks_are_dropped() {
        assert_eq!(parse_picks("0,4,x", 3), Vec::<usize>::new());
    }

    #[test]
    fn blank_answer_picks_nothing() {
        assert!(parse_picks("", 2).is_empty());
    }

    #[test]
    fn cli_parses_review_flags() {
        let cli = Cli::try_parse_from(["pixel-dedup", "review", "/a", "/b", "--trash"]).unwrap();
        match cli.command {
            Commands::Review { scan, trash, .. } => {
                assert!(trash);
                assert_eq!(scan.paths.len(), 2);
            }
            other => panic!("Expected review, got {:?}", other),
        }
    }

    #[test]
    fn cli_accepts_no_directories() {
        let cli = Cli::try_parse_from(["pixel-dedup", "scan"]).unwrap();
        assert!(matches!(cli.command, Commands::Scan { ref scan, .. } if scan.paths.is_empty()));
    }
}
