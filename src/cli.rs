// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Layout:
//   link-sweeper [--config FILE] [-v...] <command>
//
//   sweep   remove failing links (checkpointed)
//   audit   report failing links in batches, change nothing
//   repair  collapse "[text]()" links (checkpointed)
//   nested  report links nested inside other links
//   posts   publish / export / update / delete WordPress posts, clear
//           authors, list media
//
// Every path flag is optional. When it is missing the value from the config
// file (or its built-in default) is used.
//
// Rust concepts:
// - Nested subcommands: an enum variant can itself hold a Subcommand enum
// - Option<T>: "flag not given" is None, so config values can fill the gap
// - ArgAction::Count: -v, -vv, -vvv become 1, 2, 3
// =============================================================================

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Parser, Debug)]
#[command(
    name = "link-sweeper",
    version,
    about = "Sweep dead links out of Markdown blog folders",
    long_about = "link-sweeper walks a folder of Markdown posts, checks every http(s) link with a \
                  HEAD request and removes the ones that fail. Runs are checkpointed, so an \
                  interrupted sweep picks up where it stopped. It can also repair empty links, \
                  report nested links and sync posts with a WordPress.com site."
)]
pub struct Cli {
    /// Configuration file (TOML). Missing file = built-in defaults
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// More diagnostics on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remove links to failing URLs from every Markdown file under a folder
    ///
    /// Example: link-sweeper sweep ./blog --report failing.csv
    Sweep {
        /// Folder to walk (recursively)
        directory: PathBuf,

        /// Checkpoint log of finished files
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// CSV report of failing URLs (appended)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Log of files that could not be processed
        #[arg(long)]
        error_log: Option<PathBuf>,

        /// Print the summary as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Report failing links without touching any file
    ///
    /// Example: link-sweeper audit ./blog --batch-size 50
    Audit {
        directory: PathBuf,

        /// Flush the report every N files
        #[arg(long)]
        batch_size: Option<usize>,

        #[arg(long)]
        report: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Turn "[text]()" into "text" in every Markdown file under a folder
    Repair {
        directory: PathBuf,

        #[arg(long)]
        checkpoint: Option<PathBuf>,

        #[arg(long)]
        error_log: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Report links whose text contains another link
    Nested {
        directory: PathBuf,

        /// CSV report (overwritten)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Work with posts on the WordPress.com site
    ///
    /// The site and token come from [wordpress] in the config file or from
    /// the WP_SITE and WP_ACCESS_TOKEN environment variables (.env works too).
    Posts {
        #[command(subcommand)]
        command: PostCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum PostCommands {
    /// Create one post per Markdown file in a folder (not recursive)
    Publish {
        directory: PathBuf,

        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Write every post as a JSON index: [{"ID", "title", "URL"}]
    Export {
        #[arg(long)]
        output: PathBuf,

        /// Only posts in this category (default: [wordpress] category)
        #[arg(long)]
        category: Option<String>,

        /// "post", "page" or "any" (default: [wordpress] post_type)
        #[arg(long)]
        post_type: Option<String>,
    },

    /// Update existing posts from the Markdown files in a folder
    ///
    /// Posts are matched by title first, then by public URL.
    Update {
        directory: PathBuf,

        /// JSON index produced by `posts export`
        #[arg(long)]
        index: PathBuf,

        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Delete every post listed in a JSON index
    Delete {
        #[arg(long)]
        index: PathBuf,
    },

    /// Unset the author of every post listed in a JSON index
    ClearAuthor {
        #[arg(long)]
        index: PathBuf,
    },

    /// Write the media library as JSON (to pick a featured image ID)
    Media {
        #[arg(long, default_value = "media.json")]
        output: PathBuf,
    },
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Option<PathBuf> for most flags?
//    - clap's default_value would hide whether the user typed the flag
//    - With Option, main.rs can fall back to the config file value
//
// 2. What does `global = true` do?
//    - The flag is accepted before or after the subcommand name
//    - `link-sweeper -v sweep .` and `link-sweeper sweep . -v` both work
//
// 3. Why u8 for verbose?
//    - ArgAction::Count counts repetitions; nobody types -v 256 times
// -----------------------------------------------------------------------------
