// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Load .env, parse command-line arguments, set up logging
// 2. Load the config file and merge CLI overrides into it
// 3. Dispatch to the appropriate subcommand handler
// 4. Print a summary (table or JSON)
// 5. Exit with proper code (0 = clean, 1 = something failing found, 2 = error)
//
// Rust concepts used:
// - async/await: Because we need to make many network requests concurrently
// - Result<T, E>: For error handling (T = success type, E = error type)
// - match: Pattern matching to handle different subcommands
// =============================================================================

// Module declarations - tells Rust about our other source files
mod checker; // src/checker/ - URL extraction, HEAD probes, Markdown links
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - TOML config + environment
mod encoding; // src/encoding.rs - charset detection and decoding
mod ledger; // src/ledger.rs - checkpoint logs
mod mutate; // src/mutate.rs - rewriting files, error log
mod report; // src/report.rs - CSV reports
mod store; // src/store/ - WordPress posts
mod walker; // src/walker/ - whole-folder runs

#[cfg(test)]
mod testutil;

use anyhow::{Context, Result};
use clap::Parser; // Parser trait enables the parse() method
use std::path::Path;
use tracing::Level;

use checker::{Denylist, LinkChecker};
use cli::{Cli, Commands, PostCommands};
use config::SweepConfig;
use mutate::ErrorLog;
use store::{DraftDefaults, PostQuery, WordPressStore};
use walker::{AuditSummary, RepairOptions, RunSummary, SweepOptions};

// The #[tokio::main] attribute transforms our async main into a real main function
#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = nothing failing found
//   Ok(1) = failing links / nested links / store failures found
//   Err = unexpected error (exit code 2)
async fn run() -> Result<i32> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = SweepConfig::load(&cli.config)?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Sweep {
            directory,
            checkpoint,
            report,
            error_log,
            json,
        } => {
            let options = SweepOptions {
                checkpoint: checkpoint.unwrap_or_else(|| config.files.checkpoint.clone()),
                report: report.unwrap_or_else(|| config.files.failing_report.clone()),
                error_log: error_log.unwrap_or_else(|| config.files.error_log.clone()),
                key: config.files.checkpoint_key,
                file_concurrency: config.links.file_concurrency,
            };
            handle_sweep(&directory, &config, &options, json).await
        }
        Commands::Audit {
            directory,
            batch_size,
            report,
            json,
        } => {
            let batch_size = batch_size.unwrap_or(config.files.batch_size);
            let report = report.unwrap_or_else(|| config.files.audit_report.clone());
            handle_audit(&directory, &config, &report, batch_size, json).await
        }
        Commands::Repair {
            directory,
            checkpoint,
            error_log,
            json,
        } => {
            let options = RepairOptions {
                checkpoint: checkpoint.unwrap_or_else(|| config.files.repair_checkpoint.clone()),
                error_log: error_log.unwrap_or_else(|| config.files.error_log.clone()),
                key: config.files.checkpoint_key,
            };
            handle_repair(&directory, &options, json)
        }
        Commands::Nested { directory, output } => {
            let output = output.unwrap_or_else(|| config.files.nested_report.clone());
            handle_nested(&directory, &output)
        }
        Commands::Posts { command } => handle_posts(command, &config).await,
    }
}

// -v flags map to: WARN (none), INFO, DEBUG, TRACE
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn link_tools(config: &SweepConfig) -> Result<(LinkChecker, Denylist)> {
    let checker = LinkChecker::new(config.links.timeout(), config.links.concurrency)?;
    let denylist = Denylist::new(&config.links.denylist);
    Ok((checker, denylist))
}

// Handles the 'sweep' subcommand
async fn handle_sweep(directory: &Path, config: &SweepConfig, options: &SweepOptions, json: bool) -> Result<i32> {
    println!("🔍 Sweeping dead links under: {}", directory.display());
    println!("📒 Checkpoint: {}", options.checkpoint.display());

    let (checker, denylist) = link_tools(config)?;
    let summary = walker::sweep_dead_links(directory, &checker, &denylist, options).await?;

    print_run_summary(&summary, json)?;
    if summary.failing_links > 0 {
        println!("📝 Failing URLs written to {}", options.report.display());
    }
    if summary.failed > 0 {
        println!("⚠️  {} file(s) failed, see {}", summary.failed, options.error_log.display());
    }

    Ok(exit_code(summary.failing_links > 0 || summary.failed > 0))
}

// Handles the 'audit' subcommand
async fn handle_audit(
    directory: &Path,
    config: &SweepConfig,
    report: &Path,
    batch_size: usize,
    json: bool,
) -> Result<i32> {
    println!("🔍 Auditing links under: {}", directory.display());
    println!("📊 Batch size: {}", batch_size);

    let (checker, denylist) = link_tools(config)?;
    let summary = walker::audit_links(
        directory,
        &checker,
        &denylist,
        report,
        batch_size,
        config.links.file_concurrency,
    )
    .await?;

    print_audit_summary(&summary, json)?;
    Ok(exit_code(summary.failing_links > 0 || summary.unreadable > 0))
}

// Handles the 'repair' subcommand
fn handle_repair(directory: &Path, options: &RepairOptions, json: bool) -> Result<i32> {
    println!("🔧 Repairing empty links under: {}", directory.display());

    let summary = walker::repair_empty_links_in(directory, options)?;
    print_run_summary(&summary, json)?;

    Ok(exit_code(summary.failed > 0))
}

// Handles the 'nested' subcommand
// A report that cannot be written is announced, not fatal
fn handle_nested(directory: &Path, output: &Path) -> Result<i32> {
    println!("🔍 Looking for nested links under: {}", directory.display());

    let records = walker::find_nested_links_in(directory)?;
    match report::overwrite_rows(output, &records) {
        Ok(()) => println!("✅ CSV file {} created successfully", output.display()),
        Err(error) => println!("❌ Failed to create CSV file {}: {:#}", output.display(), error),
    }

    println!("📋 Nested links found: {}", records.len());
    Ok(exit_code(!records.is_empty()))
}

async fn handle_posts(command: PostCommands, config: &SweepConfig) -> Result<i32> {
    let wordpress = &config.wordpress;
    let site = wordpress
        .site()
        .context("no WordPress site configured (set [wordpress] site or WP_SITE)")?;
    let credentials = wordpress
        .credentials()
        .context("no WordPress access token (set [wordpress] access_token or WP_ACCESS_TOKEN)")?;
    let store = WordPressStore::new(&wordpress.api_base, &site, credentials)?;

    let defaults = DraftDefaults {
        status: wordpress.status.clone(),
        category: wordpress.category.clone(),
        post_type: wordpress.post_type.clone(),
        parent: wordpress.parent,
        featured_image: wordpress.featured_image,
    };

    match command {
        PostCommands::Publish { directory, checkpoint } => {
            let checkpoint = checkpoint.unwrap_or_else(|| config.files.publish_checkpoint.clone());
            let mut error_log = ErrorLog::new(&config.files.error_log);
            println!("📤 Publishing posts from: {}", directory.display());

            let summary = store::publish_folder(&store, &directory, &defaults, &checkpoint, &mut error_log).await?;
            print_sync_summary(&summary, &error_log)
        }
        PostCommands::Export {
            output,
            category,
            post_type,
        } => {
            let query = PostQuery {
                category: Some(category.unwrap_or_else(|| wordpress.category.clone())),
                post_type: post_type.unwrap_or_else(|| wordpress.post_type.clone()),
                per_page: wordpress.per_page,
            };
            let posts = store::export_index(&store, &query, &output).await?;
            println!("✅ {} post(s) written to {}", posts.len(), output.display());
            Ok(0)
        }
        PostCommands::Update {
            directory,
            index,
            checkpoint,
        } => {
            let checkpoint = checkpoint.unwrap_or_else(|| config.files.update_checkpoint.clone());
            let mut error_log = ErrorLog::new(&config.files.error_log);
            let posts = store::load_index(&index)?;
            println!("🔄 Updating {} indexed post(s) from: {}", posts.len(), directory.display());

            let summary = store::update_from_index(
                &store,
                &directory,
                &posts,
                &defaults,
                wordpress.public_base_url.as_deref(),
                &checkpoint,
                &mut error_log,
            )
            .await?;
            print_sync_summary(&summary, &error_log)
        }
        PostCommands::Delete { index } => {
            let posts = store::load_index(&index)?;
            let deleted = store::delete_from_index(&store, &posts).await?;
            println!("🗑️  {} post(s) deleted", deleted);
            Ok(0)
        }
        PostCommands::ClearAuthor { index } => {
            let posts = store::load_index(&index)?;
            println!("👤 Clearing the author of {} post(s)", posts.len());
            let summary = store::clear_authors_from_index(&store, &posts).await?;
            print_sync_summary(&summary, &ErrorLog::new(&config.files.error_log))
        }
        PostCommands::Media { output } => {
            let media = store::export_media(&store, &output).await?;
            println!("🖼️  {} media item(s) written to {}", media.len(), output.display());
            Ok(0)
        }
    }
}

fn exit_code(found_problems: bool) -> i32 {
    if found_problems {
        1
    } else {
        0
    }
}

fn print_run_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!();
    println!("📊 Summary:");
    println!("   📄 Markdown files: {}", summary.discovered);
    println!("   ⏭️  Already checkpointed: {}", summary.skipped);
    println!("   ✅ Processed: {}", summary.processed);
    println!("   ❌ Failed: {}", summary.failed);
    println!("   🔗 Failing links: {}", summary.failing_links);
    println!("   ✂️  Links removed: {}", summary.links_removed);
    Ok(())
}

fn print_audit_summary(summary: &AuditSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!();
    println!("📊 Summary:");
    println!("   📄 Files checked: {}", summary.files);
    println!("   🔗 Failing links: {}", summary.failing_links);
    println!("   ⚠️  Unreadable files: {}", summary.unreadable);
    println!("   💾 Report flushes: {}", summary.flushes.len());
    Ok(())
}

fn print_sync_summary(summary: &store::SyncSummary, error_log: &ErrorLog) -> Result<i32> {
    println!();
    println!("📊 Summary:");
    println!("   📄 Files: {}", summary.files);
    println!("   ⏭️  Already done: {}", summary.skipped);
    println!("   ✅ Succeeded: {}", summary.succeeded);
    println!("   🔍 Not found: {}", summary.not_found);
    println!("   ❌ Failed: {}", summary.failed);
    if error_log.written() > 0 {
        println!("   📝 {} line(s) written to {}", error_log.written(), error_log.path().display());
    }
    Ok(exit_code(summary.has_failures()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(false), 0);
        assert_eq!(exit_code(true), 1);
    }

    #[test]
    fn link_tools_use_config_denylist() {
        let config = SweepConfig::from_toml("[links]\ndenylist = [\"blocked.example\"]\n").expect("config");
        let (_, denylist) = link_tools(&config).expect("tools");
        let blocked = url::Url::parse("https://cdn.blocked.example/a").expect("url");
        let open = url::Url::parse("https://open.example/a").expect("url");
        assert!(denylist.blocks(&blocked));
        assert!(!denylist.blocks(&open));
    }
}
