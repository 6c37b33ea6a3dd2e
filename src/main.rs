//! Command-line interface for the FreeDict English/German dictionary library.
//!
//! This CLI imports the dictd files into the local database, looks words up
//! in either language and manages the database and cache files.

use clap::{Parser, Subcommand};
use colored::*;
use freedict_rs::{
    DictionaryEntry, Direction, FreedictDictionary, ImportOptions, ImportPhase, ImportProgress,
    ImportResult, LoadOptions, ParsedEntry, progress_channel,
};
use freedict_rs::error::Result;
use freedict_rs::import::DEFAULT_BATCH_SIZE;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{LevelFilter, debug, error, info, warn};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about = "Offline English/German dictionary CLI (FreeDict)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a custom database file (optional)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Directory containing the freedict-*.dictd folders (optional)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for decompressed dictionary files (optional)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Set verbosity level (use -v, -vv, or -vvv for increasing verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import both dictionary directions into the database
    Import {
        /// Records per insert transaction
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Keep entries from previous imports instead of replacing them
        #[arg(long, default_value_t = false)]
        keep_existing: bool,
    },
    /// Look up a word (English by default)
    Lookup {
        word: String,
        /// Treat the word as German
        #[arg(short, long, default_value_t = false)]
        german: bool,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Suggest words starting with a prefix
    Suggest {
        prefix: String,
        #[arg(short, long, default_value_t = false)]
        german: bool,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Look a word up directly in the dictd files, bypassing the database
    Offline {
        word: String,
        #[arg(short, long, default_value_t = false)]
        german: bool,
    },
    /// Show a random entry
    Random,
    /// Show database statistics
    Stats,
    /// Delete the dictionary database
    ClearDb,
    /// Delete the decompressed dictionary files
    ClearCache,
}

/// Sets up logging based on verbosity level.
fn setup_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter(None, log_level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

fn fail(context: &str, e: impl std::fmt::Display) -> ! {
    error!("{}: {}", context, e);
    eprintln!("{}", format!("{}: {}", context, e).red());
    std::process::exit(1);
}

fn bar_style(with_length: bool) -> ProgressStyle {
    let template = if with_length {
        "{prefix:>12.cyan.bold} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({percent}%) {msg}"
    } else {
        "{prefix:>12.cyan.bold} [{elapsed_precise}] {spinner} {msg}"
    };
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

/// Renders import progress events, one bar per phase.
async fn display_progress(mut rx: mpsc::Receiver<ImportProgress>, multi_progress: MultiProgress) {
    let mut bars: HashMap<ImportPhase, ProgressBar> = HashMap::new();

    while let Some(update) = rx.recv().await {
        // Bars of earlier phases are done once a later phase starts.
        for (phase, pb) in bars.iter() {
            if *phase != update.phase && !pb.is_finished() {
                pb.finish_and_clear();
            }
        }
        if update.phase.is_terminal() {
            continue;
        }

        let counted = update.phase == ImportPhase::ImportingEntries;
        let pb = bars.entry(update.phase).or_insert_with(|| {
            let pb = multi_progress.add(ProgressBar::new(if counted { update.total_entries } else { 0 }));
            pb.set_style(bar_style(counted));
            pb.set_prefix(update.phase.description());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        if counted {
            pb.set_length(update.total_entries);
            pb.set_position(update.processed_entries);
        }
        pb.set_message(update.message.clone());
    }

    for pb in bars.values() {
        pb.finish_and_clear();
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    // These two work on files only and must not open the database.
    match &cli.command {
        Commands::ClearDb => {
            info!("Clearing database...");
            match FreedictDictionary::clear_database(cli.db_path.clone()) {
                Ok(_) => println!("{}", "Database cleared successfully.".green()),
                Err(e) => fail("Error clearing database", e),
            }
            return Ok(());
        }
        Commands::ClearCache => {
            info!("Clearing decompressed dictionaries...");
            match FreedictDictionary::clear_cache_files(cli.cache_dir.clone()) {
                Ok(_) => println!("{}", "Cache cleared successfully.".green()),
                Err(e) => fail("Error clearing cache", e),
            }
            return Ok(());
        }
        _ => {}
    }

    let load_options = LoadOptions {
        db_path: cli.db_path.clone(),
        data_dir: cli.data_dir.clone(),
        cache_dir: cli.cache_dir.clone(),
    };
    let mut dictionary = match FreedictDictionary::open(load_options) {
        Ok(dictionary) => dictionary,
        Err(e) => fail("Failed to open dictionary", e),
    };

    let outcome = match cli.command {
        Commands::Import {
            batch_size,
            keep_existing,
        } => {
            let options = ImportOptions {
                batch_size,
                clear_existing: !keep_existing,
            };
            handle_import(&mut dictionary, options).await
        }
        Commands::Lookup {
            word,
            german,
            limit,
        } => handle_lookup(&dictionary, &word, german, limit),
        Commands::Suggest {
            prefix,
            german,
            limit,
        } => handle_suggest(&dictionary, &prefix, german, limit),
        Commands::Offline { word, german } => handle_offline(&dictionary, &word, german).await,
        Commands::Random => handle_random(&dictionary),
        Commands::Stats => handle_stats(&dictionary),
        Commands::ClearDb | Commands::ClearCache => Ok(()),
    };

    if let Err(e) = outcome {
        fail("Error", e);
    }
    Ok(())
}

async fn handle_import(dictionary: &mut FreedictDictionary, options: ImportOptions) -> Result<()> {
    info!("Importing dictionaries from {:?}", dictionary.data_dir());
    let (reporter, rx) = progress_channel(64);
    let multi_progress = MultiProgress::new();
    // Leave a clean terminal even when the import returns early.
    let multi_progress = scopeguard::guard(multi_progress, |mp| {
        mp.clear().ok();
        std::io::stdout().flush().ok();
    });
    let display = tokio::spawn(display_progress(rx, (*multi_progress).clone()));

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current batch...");
            ctrl_c_token.cancel();
        }
    });

    let result = dictionary.import(options, Some(reporter), cancel).await?;
    if let Err(e) = display.await {
        debug!("Progress display task ended abnormally: {}", e);
    }
    drop(multi_progress);

    print_import_result(&result);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_import_result(result: &ImportResult) {
    let headline = if result.success {
        "Import completed".green().bold()
    } else if result.cancelled {
        "Import cancelled".yellow().bold()
    } else {
        "Import failed".red().bold()
    };
    println!(
        "{} in {:.1}s",
        headline,
        result.duration_ms as f64 / 1000.0
    );
    println!(
        "  Entries: {} total, {} imported, {} failed",
        result.total_entries,
        result.successful_entries.to_string().green(),
        result.failed_entries.to_string().red()
    );
    println!("  Records written: {}", result.inserted_records);
    println!(
        "  Database size: {:.1} MiB",
        result.resulting_store_size_bytes as f64 / (1024.0 * 1024.0)
    );
    if !result.errors.is_empty() {
        println!("  {} (first {}):", "Errors".magenta(), result.errors.len().min(10));
        for message in result.errors.iter().take(10) {
            println!("    {}", message.dimmed());
        }
    }
}

fn handle_lookup(
    dictionary: &FreedictDictionary,
    word: &str,
    german: bool,
    limit: usize,
) -> Result<()> {
    info!("Looking up '{}' (german: {})", word, german);
    let start_lookup = Instant::now();
    let entries = if german {
        dictionary.lookup_german(word, limit)?
    } else {
        dictionary.lookup_english(word, limit)?
    };
    debug!("lookup for '{}' took: {:?}", word, start_lookup.elapsed());

    if entries.is_empty() {
        println!("No entries found for '{}'.", word.yellow());
        return Ok(());
    }
    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

/// Prints one stored entry.
fn print_entry(entry: &DictionaryEntry) {
    let german = match entry.gender {
        Some(gender) => format!("{} {}", gender.article(), entry.german_word),
        None => entry.german_word.clone(),
    };
    let word_type = entry
        .word_type
        .map(|wt| wt.to_string())
        .unwrap_or_default();
    println!(
        "\n{} → {} ~ {} {}",
        entry.english_word.bold().cyan(),
        german.bold().green(),
        word_type.italic(),
        format!("[{}]", entry.direction).dimmed()
    );

    if let Some(ipa) = &entry.pronunciation_ipa {
        println!("  Pronunciation: /{}/", ipa.green());
    }
    if let Some(plural) = &entry.plural_form {
        println!("  Plural: {}", plural);
    }
    if let Some(aux) = entry.auxiliary_verb {
        println!("  Auxiliary: {:?}", aux);
    }
    if entry.is_irregular || entry.is_separable {
        let mut flags = Vec::new();
        if entry.is_irregular {
            flags.push("irregular");
        }
        if entry.is_separable {
            flags.push("separable");
        }
        println!("  {}", flags.join(", ").dimmed());
    }
    if let (Some(comp), Some(sup)) = (&entry.comparative, &entry.superlative) {
        println!("  Forms: {}, {}", comp, sup);
    }
    if let Some(domain) = &entry.domain {
        println!("  Domain: {}", domain.magenta());
    }
    for example in &entry.examples {
        match &example.target_text {
            Some(target) => println!("        {} - {}", example.source_text.italic(), target),
            None => println!("        {}", example.source_text.italic()),
        }
    }
    if !entry.additional_translations.is_empty() {
        println!(
            "        {}: {}",
            "Also".magenta(),
            entry.additional_translations.join(", ").green()
        );
    }
}

fn handle_suggest(
    dictionary: &FreedictDictionary,
    prefix: &str,
    german: bool,
    limit: usize,
) -> Result<()> {
    let suggestions = if german {
        dictionary.suggest_german(prefix, limit)?
    } else {
        dictionary.suggest_english(prefix, limit)?
    };
    if suggestions.is_empty() {
        println!("No words start with '{}'.", prefix.yellow());
    }
    for word in suggestions {
        println!("{}", word);
    }
    Ok(())
}

async fn handle_offline(dictionary: &FreedictDictionary, word: &str, german: bool) -> Result<()> {
    let direction = if german {
        Direction::DeuEng
    } else {
        Direction::EngDeu
    };
    let reader = dictionary.reader(direction);
    match reader.lookup_exact(word).await? {
        Some(entry) => print_parsed_entry(&entry),
        None => {
            println!("'{}' is not in the {} dictionary.", word.yellow(), direction);
            let suggestions = reader.suggest(word, 5).await?;
            if !suggestions.is_empty() {
                println!("Did you mean: {}", suggestions.join(", ").green());
            }
        }
    }
    Ok(())
}

fn print_parsed_entry(entry: &ParsedEntry) {
    println!("\n{}", entry.headword.bold().cyan());
    if let Some(ipa) = &entry.pronunciation_ipa {
        println!("  Pronunciation: /{}/", ipa.green());
    }
    if !entry.part_of_speech_tags.is_empty() {
        let tags: Vec<String> = entry
            .part_of_speech_tags
            .iter()
            .map(|t| t.to_string())
            .collect();
        println!("  {}", tags.join(", ").italic());
    }
    for (i, translation) in entry.translations.iter().enumerate() {
        let article = translation
            .gender
            .map(|g| format!("{} ", g.article()))
            .unwrap_or_default();
        println!(
            "  {}: {}{}",
            (i + 1).to_string().bold(),
            article,
            translation.word.green()
        );
    }
    for example in &entry.examples {
        println!("        {}", example.source_text.italic());
    }
}

fn handle_random(dictionary: &FreedictDictionary) -> Result<()> {
    info!("Getting random entry...");
    match dictionary.random_entry()? {
        Some(entry) => print_entry(&entry),
        None => println!(
            "{}",
            "The dictionary is empty. Run the import command first.".yellow()
        ),
    }
    Ok(())
}

fn handle_stats(dictionary: &FreedictDictionary) -> Result<()> {
    let stats = dictionary.statistics()?;
    println!("{}", "Dictionary statistics".bold());
    println!("  Entries:       {}", stats.total);
    println!("  Nouns:         {}", stats.nouns);
    println!("  Verbs:         {}", stats.verbs);
    println!("  Adjectives:    {}", stats.adjectives);
    println!(
        "  Genders:       der {} / die {} / das {}",
        stats.masculine, stats.feminine, stats.neuter
    );
    println!("  With examples: {}", stats.with_examples);
    println!(
        "  Database:      {:?} ({:.1} MiB)",
        dictionary.db_path(),
        dictionary.store_size_bytes()? as f64 / (1024.0 * 1024.0)
    );
    Ok(())
}
