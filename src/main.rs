use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use shoplist::config::{self, Settings};
use shoplist::model::{group_by_category, Item, ShoppingList};
use shoplist::parser::{self, DelegatedParser, ListParser, ParseConfig};
use shoplist::service::{AnthropicService, ImageAttachment};
use shoplist::db;

#[derive(Parser)]
#[command(name = "shoplist", version, about = "Turn free-form text into a sorted shopping list")]
struct Cli {
    /// Settings file (default: ./shoplist.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a shopping list from text, a file, or stdin
    Parse {
        /// List text; read from --file or stdin when omitted
        text: Option<String>,
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Use AI parsing even if disabled in settings
        #[arg(long, conflicts_with = "no_ai")]
        ai: bool,
        /// Never call the parsing service
        #[arg(long)]
        no_ai: bool,
        #[arg(long, env = "SHOPLIST_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// Save the result to history
        #[arg(long)]
        save: bool,
        /// Name for the saved list (default: timestamp)
        #[arg(long, requires = "save")]
        name: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show the category for each name
    Classify {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Check whether the API key is accepted
    ValidateKey {
        #[arg(long, env = "SHOPLIST_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
    /// Find groceries in a photo and suggest what to buy
    Scan {
        image: PathBuf,
        /// Append the suggestions to this saved list
        #[arg(long)]
        list: Option<i64>,
        #[arg(long, env = "SHOPLIST_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
    /// Saved lists, newest first
    Lists,
    /// Print a saved list
    Show { id: i64 },
    /// Delete a saved list
    Delete { id: i64 },
    /// Delete one item from a saved list (ids are shown by `show`)
    RemoveItem { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = config::load(cli.config.as_deref()).context("failed to load settings")?;

    let result = match cli.command {
        Commands::Parse {
            text,
            file,
            ai,
            no_ai,
            api_key,
            save,
            name,
            json,
        } => {
            let raw = read_input(text, file.as_deref())?;
            let use_ai = (settings.ai.enabled || ai) && !no_ai;
            let credential = api_key.unwrap_or_else(|| settings.ai.api_key.clone());
            let parse_config = if use_ai {
                ParseConfig::new(true, credential)
            } else {
                ParseConfig::manual()
            };

            let list_parser = ListParser::new(delegated_parser(&settings)?);
            let progress = parse_config
                .credential
                .is_some()
                .then(|| spinner("Asking the parsing service..."));
            let outcome = list_parser
                .process_until(&raw, &parse_config, parser::until_signal(tokio::signal::ctrl_c()))
                .await;
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }
            let Some(outcome) = outcome else {
                println!("Cancelled.");
                return Ok(());
            };
            if use_ai && parse_config.credential.is_none() {
                eprintln!("AI parsing is on but no API key is set; used manual parsing.");
            }

            if json {
                let report = ParseReport {
                    items: &outcome.items,
                    warning: outcome.warning.as_ref().map(|w| w.to_string()),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                if let Some(warning) = &outcome.warning {
                    eprintln!("AI parsing failed ({}); used manual parsing instead.", warning);
                }
                print_items(&outcome.items);
            }

            if save {
                let name = name.unwrap_or_else(|| ShoppingList::default_name(chrono::Utc::now()));
                let list = ShoppingList::new(name, outcome.items);
                let mut conn = open_db(&settings)?;
                let id = db::save_list(&mut conn, &list)?;
                println!("Saved as list #{} \"{}\"", id, list.name);
            }
            Ok(())
        }
        Commands::Classify { names } => {
            for name in &names {
                println!("{:<30} {}", name, parser::classify(name).label());
            }
            Ok(())
        }
        Commands::ValidateKey { api_key } => {
            let credential = api_key.unwrap_or_else(|| settings.ai.api_key.clone());
            if credential.trim().is_empty() {
                bail!("no API key given; pass --api-key or set SHOPLIST_API_KEY");
            }
            let delegated = delegated_parser(&settings)?;
            let pb = spinner("Checking key...");
            let valid = delegated.validate(&credential).await;
            pb.finish_and_clear();
            if valid {
                println!("API key accepted.");
                Ok(())
            } else {
                bail!("API key was rejected")
            }
        }
        Commands::Scan {
            image,
            list,
            api_key,
        } => {
            let credential = api_key.unwrap_or_else(|| settings.ai.api_key.clone());
            let bytes = std::fs::read(&image)
                .with_context(|| format!("failed to read image {}", image.display()))?;
            let attachment = ImageAttachment::from_path_bytes(&image, bytes);

            let delegated = delegated_parser(&settings)?;
            let pb = spinner("Analyzing image...");
            let analysis = delegated.analyze_image(attachment, &credential).await;
            pb.finish_and_clear();
            let analysis = analysis.context("image analysis failed")?;

            println!("Found: {}", join_or_dash(&analysis.items_found));
            println!("Suggested: {}", join_or_dash(&analysis.suggestions));

            if let Some(list_id) = list {
                let mut conn = open_db(&settings)?;
                if db::fetch_list(&conn, list_id)?.is_none() {
                    bail!("no saved list #{}", list_id);
                }
                let existing = db::item_count(&conn, list_id)?;
                let items = parser::append_items(existing, &analysis.suggestions);
                db::append_items(&mut conn, list_id, &items)?;
                println!("Added {} items to list #{}", items.len(), list_id);
            }
            Ok(())
        }
        Commands::Lists => {
            let conn = open_db(&settings)?;
            let lists = db::fetch_lists(&conn)?;
            if lists.is_empty() {
                println!("No saved lists. Use 'parse --save' to store one.");
                return Ok(());
            }
            println!("{:>4} | {:<28} | {:<25} | {:>5}", "#", "Name", "Created", "Items");
            println!("{}", "-".repeat(72));
            for l in &lists {
                println!(
                    "{:>4} | {:<28} | {:<25} | {:>5}",
                    l.id,
                    truncate(&l.name, 28),
                    l.created_at,
                    l.item_count
                );
            }
            Ok(())
        }
        Commands::Show { id } => {
            let conn = open_db(&settings)?;
            let Some((list, stored)) = db::fetch_list(&conn, id)? else {
                bail!("no saved list #{}", id);
            };
            println!("{} ({})", list.name, list.created_at.format("%Y-%m-%d %H:%M"));
            let mut current = None;
            for stored_item in &stored {
                let category = stored_item.item.category();
                if current != Some(category) {
                    println!("\n{}", category.label());
                    current = Some(category);
                }
                println!("  [{:>4}] {}", stored_item.id, stored_item.item.name());
            }
            Ok(())
        }
        Commands::Delete { id } => {
            let conn = open_db(&settings)?;
            if !db::delete_list(&conn, id)? {
                bail!("no saved list #{}", id);
            }
            println!("Deleted list #{}", id);
            Ok(())
        }
        Commands::RemoveItem { id } => {
            let conn = open_db(&settings)?;
            if !db::delete_item(&conn, id)? {
                bail!("no item #{}", id);
            }
            println!("Removed item #{}", id);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("Done in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

#[derive(Serialize)]
struct ParseReport<'a> {
    items: &'a [Item],
    warning: Option<String>,
}

fn delegated_parser(settings: &Settings) -> Result<DelegatedParser<AnthropicService>> {
    let service = AnthropicService::new(&settings.ai).context("failed to build HTTP client")?;
    Ok(DelegatedParser::new(service, settings.ai.max_tokens))
}

fn open_db(settings: &Settings) -> Result<rusqlite::Connection> {
    let conn = db::connect(&settings.storage.db_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn read_input(text: Option<String>, file: Option<&Path>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

fn spinner(msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_items(items: &[Item]) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }
    for (category, members) in group_by_category(items) {
        println!("{}", category.label());
        for item in members {
            println!("  - {}", item.name());
        }
    }
    println!("\n{} items", items.len());
}

fn join_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
