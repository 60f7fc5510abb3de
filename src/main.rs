use std::sync::Arc;

use chrono::Datelike;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{AccessAction, Cli, Command};
use dossier::{
    Bot,
    CatalogIndex,
    Config,
    DataDir,
    SettingsDb,
    access::{AccessGuard, Revocation},
    assistant,
    birthdays::DayMonth,
    chat,
    error,
    handles::HandleTable,
    mcp,
    render,
    selector::{FolderContentSelector, Selection, SummaryForm, SummaryLookup},
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOSSIER_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let config = Config::load(&Config::locate(cli.config.as_deref(), &data_dir))?;

    match cli.command {
        Command::Chat(args) => {
            let bot = open_bot(&config, &data_dir)?;
            let user = args.user.or(config.main_admin_id).unwrap_or(0);
            chat::run_chat(bot, user)?;
        }
        Command::Mcp => {
            let bot = open_bot(&config, &data_dir)?;
            mcp::run_mcp(bot)?;
        }
        Command::Index(args) => {
            cmd_index(&config, args.json)?;
        }
        Command::Search(args) => {
            cmd_search(&config, &args.query, args.json)?;
        }
        Command::Show(args) => {
            cmd_show(&config, &args.folder, args.full)?;
        }
        Command::Surnames(args) => {
            cmd_surnames(&config, args.json)?;
        }
        Command::Birthdays(args) => {
            cmd_birthdays(&config, args.date.as_deref())?;
        }
        Command::Access { action } => {
            let settings = Arc::new(SettingsDb::open(&data_dir.settings_db())?);
            let guard = AccessGuard::new(
                config.main_admin_id,
                config.whitelisted_user_ids.iter().copied(),
                settings,
            );
            match action {
                AccessAction::Add { user } => access_add(&guard, user)?,
                AccessAction::Remove { user } => access_remove(&guard, user)?,
                AccessAction::List { json } => access_list(&guard, json)?,
            }
        }
        Command::Completions(_) => {}
    }

    Ok(())
}

fn open_bot(config: &Config, data_dir: &DataDir) -> error::Result<Bot> {
    let settings = Arc::new(SettingsDb::open(&data_dir.settings_db())?);
    let assistant = assistant::from_config(&config.assistant)?;
    Bot::from_config(config, settings, assistant)
}

fn load_catalog(config: &Config) -> error::Result<CatalogIndex> {
    CatalogIndex::load(
        &config.file_list(),
        &config.base_folder_name,
        config.name_cleaner()?,
    )
}

fn cmd_index(config: &Config, json: bool) -> error::Result<()> {
    let catalog = load_catalog(config)?;
    let birthdays = config.birthday_book()?;

    if json {
        let value = json!({
            "file_list": config.file_list(),
            "base_folder": catalog.base_folder(),
            "paths": catalog.paths().len(),
            "folders": catalog.folders().len(),
            "surnames": catalog.surnames().len(),
            "categories": catalog.surnames_by_category().len(),
            "birthdays": birthdays.len(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("File list: {}", config.file_list().display());
        println!("Base folder: {}", catalog.base_folder());
        println!("Paths: {}", catalog.paths().len());
        println!("Folders: {}", catalog.folders().len());
        println!("Surnames: {}", catalog.surnames().len());
        for (category, surnames) in catalog.surnames_by_category() {
            println!("  {category}: {}", surnames.len());
        }
        println!("Birthdays: {}", birthdays.len());
    }
    Ok(())
}

fn cmd_search(config: &Config, query: &str, json: bool) -> error::Result<()> {
    let catalog = load_catalog(config)?;
    let matches = catalog.search(query);

    if json {
        let results: Vec<_> = matches
            .iter()
            .map(|folder| {
                json!({ "folder": folder, "name": catalog.display_name(folder) })
            })
            .collect();
        let value = json!({ "query": query, "results": results });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if matches.is_empty() {
        println!("No folders match '{query}'");
    } else {
        for folder in &matches {
            println!("{}\t{folder}", catalog.display_name(folder));
        }
        println!("\n{} match(es)", matches.len());
    }
    Ok(())
}

/// Resolve a folder path, or a query with exactly one match.
fn resolve_folder(catalog: &CatalogIndex, reference: &str) -> error::Result<String> {
    let reference = reference.trim().trim_end_matches('/');
    if let Some(folder) = catalog.folders().iter().find(|f| f.as_str() == reference) {
        return Ok(folder.clone());
    }

    let mut matches = catalog.search(reference);
    match matches.len() {
        0 => Err(error::Error::NotFound {
            kind: "folder",
            name: reference.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        n => Err(error::Error::Config(format!(
            "'{reference}' matches {n} folders, use the folder path: {}",
            matches.join(", ")
        ))),
    }
}

fn cmd_show(config: &Config, reference: &str, full: bool) -> error::Result<()> {
    let catalog = load_catalog(config)?;
    let folder = resolve_folder(&catalog, reference)?;
    let selector = FolderContentSelector::new(
        config.document_root(),
        config.file_rules()?,
        config.folder_budget(),
    );

    println!("Folder: {}", catalog.display_name(&folder));
    println!("Path: {folder}");

    let form = if full {
        SummaryForm::Full
    } else {
        SummaryForm::Short
    };
    match selector.read_summary(&catalog, &folder, form) {
        SummaryLookup::Found(summary) => {
            println!("\n--- summary ({}) ---", summary.path.display());
            println!("{}", summary.text);
        }
        SummaryLookup::Blank(path) => {
            println!("\nSummary file is empty: {}", path.display());
        }
        SummaryLookup::Missing => println!("\nSummary not found."),
        SummaryLookup::Unreadable { path, error } => {
            println!("\nCould not read {}: {error}", path.display());
        }
    }

    match selector.select(&catalog, &folder, &HandleTable::new()) {
        Selection::Empty { .. } => println!("\nThe folder is empty."),
        Selection::Contents(contents) => {
            if !contents.documents.is_empty() {
                println!("\nDocuments:");
            }
            for document in &contents.documents {
                println!(
                    "  {} ({:.2} MB)\t{}",
                    document.display_name,
                    document.size_mb,
                    document.path.display()
                );
            }
            for notice in &contents.truncation_notices {
                println!("{notice}");
            }
        }
    }
    Ok(())
}

fn cmd_surnames(config: &Config, json: bool) -> error::Result<()> {
    let catalog = load_catalog(config)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(catalog.surnames_by_category())?
        );
    } else {
        for chunk in render::surname_listing(catalog.surnames_by_category()) {
            println!("{chunk}\n");
        }
    }
    Ok(())
}

fn cmd_birthdays(config: &Config, date: Option<&str>) -> error::Result<()> {
    let book = config.birthday_book()?;
    let today = book.today();
    let date = match date {
        Some(raw) => {
            let day: DayMonth = raw.parse()?;
            day.in_year(today.year())
                .or_else(|| day.in_year(2000))
                .unwrap_or(today)
        }
        None => today,
    };

    let names = book.on(date);
    if names.is_empty() {
        println!("No birthdays on {}.", DayMonth::of(date));
        return Ok(());
    }

    let catalog = load_catalog(config)?;
    println!("Birthdays on {}:", DayMonth::of(date));
    for name in names {
        match catalog.find_folder_by_name(name) {
            Some(folder) => println!("  {name}\t{folder}"),
            None => println!("  {name}\t(no folder)"),
        }
    }
    Ok(())
}

fn access_add(guard: &AccessGuard, user: u64) -> error::Result<()> {
    let granted_by = guard.main_admin().unwrap_or(0);
    if guard.grant(user, granted_by)? {
        println!("Granted access to {user}");
    } else {
        println!("{user} already has access");
    }
    Ok(())
}

fn access_remove(guard: &AccessGuard, user: u64) -> error::Result<()> {
    match guard.revoke(user)? {
        Revocation::Removed => println!("Revoked access of {user}"),
        Revocation::NotPresent => {
            return Err(error::Error::NotFound {
                kind: "access entry",
                name: user.to_string(),
            });
        }
        Revocation::MainAdmin => {
            return Err(error::Error::Config(format!(
                "{user} is the main admin and cannot be removed"
            )));
        }
        Revocation::Configured => {
            return Err(error::Error::Config(format!(
                "{user} is listed in the configuration file; remove it there"
            )));
        }
    }
    Ok(())
}

fn access_list(guard: &AccessGuard, json: bool) -> error::Result<()> {
    let users = guard.access_list()?;
    let main_admin = guard.main_admin();

    if json {
        let value = json!({ "main_admin": main_admin, "users": users });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        if let Some(admin) = main_admin {
            println!("Main admin: {admin}");
        }
        if users.is_empty() {
            println!("No users on the access list.");
        } else {
            for user in &users {
                println!("{user}");
            }
        }
    }
    Ok(())
}
