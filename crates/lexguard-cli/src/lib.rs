// lexguard-cli: shared utilities for CLI tools.

use std::path::PathBuf;
use std::process;

use lexguard_tr::config::EngineOptions;
use lexguard_tr::lexicon::InMemoryLexicon;
use tracing_subscriber::EnvFilter;

/// Seed file looked for in the working directory.
const LEXICON_FILE: &str = "lexicon.json";

/// Environment variable naming the seed file.
const LEXICON_ENV: &str = "LEXGUARD_LEXICON";

/// Environment variable naming the TOML options file.
const CONFIG_ENV: &str = "LEXGUARD_CONFIG";

/// Install a `tracing` subscriber on stderr, filtered by `RUST_LOG`
/// (default `warn`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Search for a seed file and load it into an in-memory lexicon.
///
/// Search order:
/// 1. `lexicon_path` argument (if provided)
/// 2. `LEXGUARD_LEXICON` environment variable
/// 3. `lexicon.json` in the current working directory
pub fn load_lexicon(
    lexicon_path: Option<&str>,
    options: &EngineOptions,
) -> Result<InMemoryLexicon, String> {
    let search_paths = build_search_paths(lexicon_path);

    for path in &search_paths {
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading lexicon");
            return InMemoryLexicon::from_path(path, options.false_positive)
                .map_err(|e| format!("failed to load {}: {e}", path.display()));
        }
    }

    Err(format!(
        "could not find a lexicon in any of the search paths:\n{}",
        search_paths
            .iter()
            .map(|p| format!("  - {}", p.display()))
            .collect::<Vec<_>>()
            .join("\n")
    ))
}

/// Build the list of candidate seed files.
fn build_search_paths(lexicon_path: Option<&str>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(p) = lexicon_path {
        paths.push(PathBuf::from(p));
    }
    if let Ok(env_path) = std::env::var(LEXICON_ENV) {
        paths.push(PathBuf::from(env_path));
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(LEXICON_FILE));
    }

    paths
}

/// Load engine options from `config_path` or `LEXGUARD_CONFIG`, falling back
/// to defaults when neither is set.
pub fn load_options(config_path: Option<&str>) -> Result<EngineOptions, String> {
    let path = match config_path {
        Some(p) => PathBuf::from(p),
        None => match std::env::var(CONFIG_ENV) {
            Ok(p) => PathBuf::from(p),
            Err(_) => return Ok(EngineOptions::default()),
        },
    };
    EngineOptions::from_path(&path).map_err(|e| format!("failed to load {}: {e}", path.display()))
}

/// Pull `--NAME=VALUE`, `--NAME VALUE` or `-S VALUE` out of the args.
///
/// Returns `(value, remaining_args)`.
pub fn parse_flag_value(
    args: &[String],
    long: &str,
    short: Option<&str>,
) -> Result<(Option<String>, Vec<String>), String> {
    let prefix = format!("{long}=");
    let mut value = None;
    let mut remaining = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if let Some(val) = arg.strip_prefix(&prefix) {
            value = Some(val.to_string());
        } else if arg == long || short.is_some_and(|s| arg == s) {
            match iter.next() {
                Some(val) => value = Some(val.clone()),
                None => return Err(format!("{arg} requires a value")),
            }
        } else {
            remaining.push(arg.clone());
        }
    }

    Ok((value, remaining))
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}
