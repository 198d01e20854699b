//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use trellis_core::{Block, BoardMember, User};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a success message (suppressed in quiet and JSON modes)
    pub fn success(&self, message: &str) {
        if self.format == OutputFormat::Human {
            println!("{}", message);
        }
    }

    /// Print any serializable value as pretty JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to encode JSON: {}", e),
        }
    }

    /// Print a single block
    pub fn print_block(&self, block: &Block) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", block.id);
                println!("Type:     {}", block.block_type);
                if !block.title.is_empty() {
                    println!("Title:    {}", block.title);
                }
                if !block.parent_id.is_empty() {
                    println!("Parent:   {}", block.parent_id);
                }
                println!("Board:    {}", block.root_id);
                if !block.team_id.is_empty() {
                    println!("Team:     {}", block.team_id);
                }
                if block.fields.as_object().is_some_and(|m| !m.is_empty()) {
                    println!("Fields:   {}", block.fields);
                }
                println!("Created:  {}", block.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:  {}", block.updated_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => self.print_json(block),
            OutputFormat::Quiet => println!("{}", block.id),
        }
    }

    /// Print a list of blocks, one per line
    pub fn print_blocks(&self, blocks: &[Block]) {
        match self.format {
            OutputFormat::Human => {
                if blocks.is_empty() {
                    println!("No blocks found.");
                    return;
                }
                for block in blocks {
                    println!(
                        "{}  {:<10} {}",
                        block.id,
                        block.block_type.as_str(),
                        title_or_dash(block)
                    );
                }
            }
            OutputFormat::Json => self.print_json(blocks),
            OutputFormat::Quiet => {
                for block in blocks {
                    println!("{}", block.id);
                }
            }
        }
    }

    /// Print a resolved subtree, indenting each block under its parent
    pub fn print_tree(&self, blocks: &[Block]) {
        if self.format != OutputFormat::Human {
            return self.print_blocks(blocks);
        }
        if blocks.is_empty() {
            println!("No blocks found.");
            return;
        }

        let mut depth: HashMap<&str, usize> = HashMap::new();
        for block in blocks {
            let level = depth
                .get(block.parent_id.as_str())
                .map(|d| d + 1)
                .unwrap_or(0);
            depth.insert(block.id.as_str(), level);
            println!(
                "{}{} [{}] {}",
                "  ".repeat(level),
                block.id,
                block.block_type,
                title_or_dash(block)
            );
        }
    }

    pub fn print_user(&self, user: &User) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", user.id);
                println!("Username: {}", user.username);
                println!("Email:    {}", user.email);
                println!("Guest:    {}", if user.is_guest { "yes" } else { "no" });
                println!("Created:  {}", user.created_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => self.print_json(user),
            OutputFormat::Quiet => println!("{}", user.id),
        }
    }

    pub fn print_members(&self, members: &[BoardMember]) {
        match self.format {
            OutputFormat::Human => {
                if members.is_empty() {
                    println!("No members.");
                    return;
                }
                for member in members {
                    let role = if member.scheme_admin {
                        "admin"
                    } else if member.scheme_editor {
                        "editor"
                    } else {
                        "viewer"
                    };
                    println!("{}  {}", member.user_id, role);
                }
            }
            OutputFormat::Json => self.print_json(members),
            OutputFormat::Quiet => {
                for member in members {
                    println!("{}", member.user_id);
                }
            }
        }
    }

    pub fn print_settings(&self, settings: &BTreeMap<String, String>) {
        match self.format {
            OutputFormat::Human => {
                if settings.is_empty() {
                    println!("No settings.");
                }
                for (key, value) in settings {
                    println!("{} = {}", key, value);
                }
            }
            OutputFormat::Json => self.print_json(settings),
            OutputFormat::Quiet => {
                for value in settings.values() {
                    println!("{}", value);
                }
            }
        }
    }
}

fn title_or_dash(block: &Block) -> &str {
    if block.title.is_empty() {
        "-"
    } else {
        &block.title
    }
}
