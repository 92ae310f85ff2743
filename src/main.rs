use anyhow::{Context, Result};
use clap::Parser;
use ngram_regex::config::Config;
use ngram_regex::discovery::FileDiscovery;
use ngram_regex::index::{Document, FileContentLoader, Index, MappedFile, Schema};
use ngram_regex::locale::Locale;
use ngram_regex::ngram::NGramAnalyzer;
use ngram_regex::search::{ExecutionStats, RegexQuery};
use ngram_regex::utils::{format_bytes, is_binary_content};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const PATH_FIELD: &str = "path";
const CONTENT_FIELD: &str = "content";
const NGRAM_FIELD: &str = "content.ngram";

/// Search files for a regex, using an n-gram index to skip files that cannot match
#[derive(Parser, Debug)]
#[command(name = "ngram_regex")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Regex to search for
    #[arg(required_unless_present = "init")]
    pattern: Option<String>,

    /// Files or directories to search (default: current directory)
    paths: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Generate a template configuration file and exit
    #[arg(long, value_name = "FILE")]
    init: Option<PathBuf>,

    /// Match case exactly
    #[arg(short = 's', long)]
    case_sensitive: bool,

    /// Language whose lowercasing rules apply (e.g. tr, el, ga)
    #[arg(long, value_name = "TAG")]
    locale: Option<String>,

    /// Treat the pattern as a literal string
    #[arg(short = 'F', long)]
    fixed_strings: bool,

    /// Stop rechecking after this many milliseconds and print partial results
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Do not build the n-gram index; scan every file
    #[arg(long)]
    no_accelerate: bool,

    /// Fail if the pattern cannot be accelerated
    #[arg(long)]
    reject_unaccelerated: bool,

    /// Print the query plan
    #[arg(long)]
    explain: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Output<'a> {
    pattern: &'a str,
    plan: String,
    matches: Vec<&'a str>,
    stats: &'a ExecutionStats,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    if let Some(init_path) = &args.init {
        if init_path.exists() {
            anyhow::bail!(
                "Config file already exists: {}\nRemove it first or choose a different path.",
                init_path.display()
            );
        }
        Config::write_template(init_path)?;
        println!("Generated config file: {}", init_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&args)?;
    let Some(pattern) = args.pattern.as_deref() else {
        anyhow::bail!("A pattern is required");
    };
    let regex = if args.fixed_strings {
        regex::escape(pattern)
    } else {
        pattern.to_string()
    };

    let settings = &config.regex;
    let accelerate = config.index.build_ngrams && !args.no_accelerate;
    let mut schema = Schema::new().with_unstored(CONTENT_FIELD);
    if accelerate {
        let analyzer = if settings.case_sensitive {
            NGramAnalyzer::new(settings.gram_size)
        } else {
            NGramAnalyzer::lowercased(settings.gram_size, settings.locale.clone())
        };
        schema = schema.with_ngram_field(NGRAM_FIELD, CONTENT_FIELD, analyzer);
    }

    let mut query = RegexQuery::new(CONTENT_FIELD, regex)?.with_settings(settings.clone());
    if accelerate {
        query = query.with_ngram_field(NGRAM_FIELD);
    }

    let paths = if args.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.paths.clone()
    };
    let index = build_index(&paths, &config, schema)?;

    let compiled = query.compile(index.schema())?;
    if args.explain {
        eprintln!("plan: {}", compiled.plan());
    }

    let loader = FileContentLoader::new(PATH_FIELD);
    let results = index.search_compiled(&compiled, &loader)?;

    let mut matches: Vec<&str> = results
        .hits
        .iter()
        .filter_map(|address| index.stored(*address, PATH_FIELD))
        .filter_map(|values| values.first().map(String::as_str))
        .collect();
    matches.sort_unstable();

    if results.stats.timed_out {
        warn!(
            timeout_ms = settings.timeout_ms,
            "Search timed out; results are partial"
        );
    }
    info!(
        matches = matches.len(),
        candidates = results.stats.candidates,
        rechecked = results.stats.rechecked,
        "Search finished"
    );

    if args.json {
        let output = Output {
            pattern,
            plan: compiled.plan().to_string(),
            matches: matches.clone(),
            stats: &results.stats,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for path in &matches {
            println!("{}", path);
        }
    }

    Ok(if matches.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn build_index(paths: &[PathBuf], config: &Config, schema: Schema) -> Result<Index> {
    let mut index = Index::new(schema, config.index.options());
    let files = FileDiscovery::new(
        paths,
        &config.index.exclude_patterns,
        Some(config.index.max_file_size),
    )?;

    let mut total_size = 0u64;
    for path in files {
        let file = MappedFile::open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let Ok(content) = file.as_str() else {
            debug!(path = %path.display(), "Skipping non-UTF-8 file");
            continue;
        };
        if is_binary_content(content) {
            debug!(path = %path.display(), "Skipping binary file");
            continue;
        }
        total_size += file.len() as u64;
        index.add_document(
            Document::new()
                .with_field(PATH_FIELD, path.to_string_lossy())
                .with_field(CONTENT_FIELD, content),
        );
    }

    info!(
        files = index.len(),
        size = %format_bytes(total_size),
        shards = index.shards().len(),
        "Indexed files"
    );
    Ok(index)
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found: {}\nUse --init {} to generate a template.",
                config_path.display(),
                config_path.display()
            );
        }
        info!(path = %config_path.display(), "Loading config from file");
        Config::from_file(config_path)?
    } else {
        match Config::from_default_locations()? {
            Some((config, path)) => {
                info!(path = %path.display(), "Loading config from default location");
                config
            }
            None => {
                debug!("No config file found, using defaults");
                Config::default()
            }
        }
    };

    // CLI flags override file values
    let settings = &mut config.regex;
    if args.case_sensitive {
        settings.case_sensitive = true;
    }
    if let Some(tag) = &args.locale {
        settings.locale = Locale::from_tag(tag);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        settings.timeout_ms = timeout_ms;
    }
    if args.reject_unaccelerated {
        settings.reject_unaccelerated = true;
    }
    Ok(config)
}
