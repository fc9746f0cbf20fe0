mod serve;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use pkgcheck_core::{
    sort_diagnostics, CheckTarget, CheckerConfig, CliOverrides, Container, Diagnostic,
};
use rayon::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// pkgcheck - check a source file in the context of its package
#[derive(Parser, Debug, Clone)]
#[command(name = "pkgcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Files to check
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Path to a pkgcheck.yaml or pkgcheck.json configuration file
    #[arg(short, long, value_name = "FILE")]
    project: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Read the contents of the single FILE from standard input
    #[arg(long)]
    stdin: bool,

    /// Include in-package test files
    #[arg(long)]
    tests: bool,

    /// Report every error instead of stopping at the error limit
    #[arg(long)]
    all_errors: bool,

    /// Sort diagnostics by file, line and column
    #[arg(long)]
    sort: bool,

    /// Target operating system for build constraints
    #[arg(long, value_name = "OS")]
    os: Option<String>,

    /// Target architecture for build constraints
    #[arg(long, value_name = "ARCH")]
    arch: Option<String>,

    /// Build tags (comma-separated)
    #[arg(long, value_name = "TAGS", value_delimiter = ',')]
    tags: Option<Vec<String>>,

    /// Import search root (repeatable, searched in order)
    #[arg(long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,

    /// Exclude interop files (files importing "C")
    #[arg(long)]
    no_interop: bool,

    /// Re-resolve every import instead of caching
    #[arg(long)]
    no_cache: bool,

    /// Maximum number of cached imports
    #[arg(long, value_name = "N")]
    cache_capacity: Option<usize>,

    /// Type errors reported per file unless --all-errors is given
    #[arg(long, value_name = "N")]
    error_limit: Option<usize>,

    /// Write a default pkgcheck.yaml to the current directory
    #[arg(long)]
    init: bool,

    /// Re-check when files in the packages change
    #[arg(short, long)]
    watch: bool,

    /// Serve JSON-lines check requests on stdin/stdout
    #[arg(long)]
    serve: bool,

    /// Worker threads for --serve
    #[arg(long, value_name = "N", default_value_t = 4)]
    workers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// How a run ended, mapped onto the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Clean,
    Diagnostics,
    Fatal,
}

impl Outcome {
    fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Clean => ExitCode::SUCCESS,
            Outcome::Diagnostics => ExitCode::from(1),
            Outcome::Fatal => ExitCode::from(2),
        }
    }
}

fn main() -> ExitCode {
    // Set RUST_LOG=debug for detailed logs; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            eprintln!("pkgcheck: {err:#}");
            Outcome::Fatal.exit_code()
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<Outcome> {
    if cli.init {
        init_project()?;
        return Ok(Outcome::Clean);
    }

    let config = load_config(&cli)?;
    debug!(?config, "configuration loaded");
    let container = Arc::new(Container::new(config));

    if cli.serve {
        serve::run(container, cli.workers)?;
        return Ok(Outcome::Clean);
    }

    if cli.files.is_empty() {
        anyhow::bail!("no input files specified. Use --help for usage information.");
    }

    if cli.watch {
        watch_mode(&cli, &container)?;
        return Ok(Outcome::Clean);
    }

    let source = if cli.stdin {
        if cli.files.len() != 1 {
            anyhow::bail!("--stdin needs exactly one FILE");
        }
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .context("failed to read standard input")?;
        Some(buffer)
    } else {
        None
    };

    check_files(&cli, &container, source)
}

/// Write a default configuration file
fn init_project() -> anyhow::Result<()> {
    let path = Path::new(pkgcheck_core::config::CONFIG_FILE_NAMES[0]);
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    CheckerConfig::init_file(path)?;
    println!("Created {}", path.display());
    Ok(())
}

/// Load configuration from file (if given or found) and apply CLI overrides
fn load_config(cli: &Cli) -> anyhow::Result<CheckerConfig> {
    let mut config = if let Some(ref project_path) = cli.project {
        CheckerConfig::from_file(project_path)
            .with_context(|| format!("failed to load {}", project_path.display()))?
    } else {
        match CheckerConfig::find_in(Path::new(".")) {
            Some(path) => CheckerConfig::from_file(&path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => CheckerConfig::default(),
        }
    };

    let mut overrides = CliOverrides {
        os: cli.os.clone(),
        arch: cli.arch.clone(),
        tags: cli.tags.clone(),
        cache_capacity: cli.cache_capacity,
        error_limit: cli.error_limit,
        ..CliOverrides::default()
    };
    if !cli.search_paths.is_empty() {
        overrides.search_paths = Some(cli.search_paths.clone());
    }
    if cli.no_interop {
        overrides.interop = Some(false);
    }
    if cli.no_cache {
        overrides.cache_enabled = Some(false);
    }
    if cli.tests {
        overrides.include_tests = Some(true);
    }
    if cli.all_errors {
        overrides.all_errors = Some(true);
    }

    config.merge(&overrides);
    config.validate()?;
    Ok(config)
}

/// Check every file, print the diagnostics and report how the run went
fn check_files(
    cli: &Cli,
    container: &Container,
    source: Option<Vec<u8>>,
) -> anyhow::Result<Outcome> {
    info!("Checking {} file(s)", cli.files.len());

    let results: Vec<_> = cli
        .files
        .par_iter()
        .map(|path| {
            let mut target: CheckTarget = container.target(path);
            if let Some(source) = &source {
                target = target.with_source(source.clone());
            }
            (path, container.check(&target))
        })
        .collect();

    let mut diagnostics = Vec::new();
    let mut fatal = false;
    for (path, result) in results {
        match result {
            Ok(found) => diagnostics.extend(found),
            Err(err) => {
                fatal = true;
                eprintln!("pkgcheck: {}: {}", path.display(), err);
            }
        }
    }

    if cli.sort {
        sort_diagnostics(&mut diagnostics);
    }
    print_diagnostics(&diagnostics, cli.format)?;

    Ok(if fatal {
        Outcome::Fatal
    } else if diagnostics.is_empty() {
        Outcome::Clean
    } else {
        Outcome::Diagnostics
    })
}

fn print_diagnostics(diagnostics: &[Diagnostic], format: Format) -> anyhow::Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(diagnostics)?),
        Format::Text => {
            for diagnostic in diagnostics {
                println!("{diagnostic}");
            }
        }
    }
    Ok(())
}

/// Watch mode - re-check on changes to the packages or to import roots
fn watch_mode(cli: &Cli, container: &Container) -> anyhow::Result<()> {
    use notify::{
        event::{EventKind, ModifyKind},
        Event, RecursiveMode, Watcher,
    };

    println!("Watching for changes... (Press Ctrl+C to stop)");

    println!("\nInitial check:");
    check_files(cli, container, None)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    // package directories of the checked files
    let mut package_dirs: Vec<PathBuf> = Vec::new();
    for file in &cli.files {
        let dir = CheckTarget::new(file).directory().to_path_buf();
        if !package_dirs.contains(&dir) {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            package_dirs.push(dir);
        }
    }
    // import roots: any change there may invalidate cached packages
    let roots: Vec<PathBuf> = container
        .config()
        .build
        .search_paths
        .iter()
        .filter(|root| root.is_dir())
        .cloned()
        .collect();
    for root in &roots {
        watcher.watch(root, RecursiveMode::Recursive)?;
    }

    let mut debounce = Debounce::new(Duration::from_millis(100), Instant::now());

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                let relevant = matches!(
                    event.kind,
                    EventKind::Modify(ModifyKind::Data(_))
                        | EventKind::Modify(ModifyKind::Name(_))
                        | EventKind::Create(_)
                        | EventKind::Remove(_)
                );
                let is_source = |path: &PathBuf| {
                    path.extension()
                        .is_some_and(|ext| ext == pkgcheck_core::syntax::SOURCE_EXTENSION)
                };
                if relevant && event.paths.iter().any(is_source) {
                    if event
                        .paths
                        .iter()
                        .any(|path| roots.iter().any(|root| path.starts_with(root)))
                    {
                        debug!("import root changed, clearing import cache");
                        container.cache().clear();
                    }
                    debounce.changed();
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                return Err(anyhow::anyhow!("File watcher disconnected"));
            }
        }

        if debounce.tick(Instant::now()) {
            println!("\n\nFile changed, re-checking...");
            check_files(cli, container, None)?;
        }
    }
}

/// Rate limit for watch-mode re-checks. A change inside the interval is
/// held back and released by a later tick instead of being dropped.
#[derive(Debug)]
struct Debounce {
    interval: Duration,
    last_check: Instant,
    pending: bool,
}

impl Debounce {
    fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_check: now,
            pending: false,
        }
    }

    /// A relevant change arrived.
    fn changed(&mut self) {
        self.pending = true;
    }

    /// True when a held-back change is due.
    fn tick(&mut self, now: Instant) -> bool {
        if !self.pending || now.duration_since(self.last_check) < self.interval {
            return false;
        }
        self.pending = false;
        self.last_check = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_apply() {
        let cli = Cli::parse_from([
            "pkgcheck",
            "--os",
            "windows",
            "--tags",
            "a,b",
            "--search-path",
            "/one",
            "--search-path",
            "/two",
            "--no-cache",
            "--error-limit",
            "3",
            "main.mini",
        ]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.build.os, "windows");
        assert_eq!(config.build.tags, vec!["a", "b"]);
        assert_eq!(
            config.build.search_paths,
            vec![PathBuf::from("/one"), PathBuf::from("/two")]
        );
        assert!(!config.import_cache.enabled);
        assert_eq!(config.error_limit, 3);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = Cli::parse_from(["pkgcheck", "--cache-capacity", "0", "main.mini"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_debounce_holds_back_fast_second_change() {
        let start = Instant::now();
        let interval = Duration::from_millis(100);
        let mut debounce = Debounce::new(interval, start);

        assert!(!debounce.tick(start + Duration::from_millis(150)));

        // first save after the interval runs at once
        debounce.changed();
        assert!(debounce.tick(start + Duration::from_millis(150)));
        // a second save right after is held, not lost
        debounce.changed();
        assert!(!debounce.tick(start + Duration::from_millis(180)));
        assert!(!debounce.tick(start + Duration::from_millis(200)));
        assert!(debounce.tick(start + Duration::from_millis(260)));
        // nothing pending afterwards
        assert!(!debounce.tick(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_outcome_codes() {
        assert_eq!(Outcome::Clean.exit_code(), ExitCode::SUCCESS);
        assert_eq!(Outcome::Diagnostics.exit_code(), ExitCode::from(1));
        assert_eq!(Outcome::Fatal.exit_code(), ExitCode::from(2));
    }
}
