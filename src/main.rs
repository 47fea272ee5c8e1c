use anyhow::{bail, Result};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use account_store::commands::{self, parse_id};
use account_store::{Account, Config, Database};

const USAGE: &str = "Usage: account-store <command>

Commands:
  init                   Create the accounts table
  import <file.json>     Load accounts from a JSON array
  list                   Show every account
  show <id>              Show one account as JSON
  rename <id> <name>     Change an account's name
  delete <id>            Remove an account
  count                  Print the number of accounts

The database location comes from DATABASE_URI (default: accounts.db).";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    };

    match command.as_str() {
        "init" => {
            let config = Config::from_env();
            config.open()?;
            println!("✓ Database initialized ({:?})", config.database);
        }
        "import" => run_import(&open()?, arg(&args, 1, "file")?)?,
        "list" => run_list(&open()?)?,
        "show" => run_show(&open()?, parse_id(arg(&args, 1, "id")?)?)?,
        "rename" => {
            let id = parse_id(arg(&args, 1, "id")?)?;
            let name = arg(&args, 2, "name")?;
            let account = commands::rename(&open()?, id, name)?;
            println!("✓ Renamed to {}", account);
        }
        "delete" => {
            let id = parse_id(arg(&args, 1, "id")?)?;
            let account = commands::delete(&open()?, id)?;
            println!("✓ Deleted {}", account);
        }
        "count" => println!("{}", Account::count(&open()?)?),
        "help" | "--help" | "-h" => println!("{}", USAGE),
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn open() -> Result<Database> {
    Config::from_env().open()
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    match args.get(index) {
        Some(value) => Ok(value.as_str()),
        None => bail!("Missing <{}> argument\n\n{}", name, USAGE),
    }
}

fn run_import(db: &Database, path: &str) -> Result<()> {
    let inserted = commands::import(db, Path::new(path))?;
    println!("✓ Inserted {} accounts from {} ({} total)", inserted, path, Account::count(db)?);
    Ok(())
}

fn run_list(db: &Database) -> Result<()> {
    let accounts = Account::all(db)?;

    for account in &accounts {
        println!(
            "{:>5}  {:<24} {:<32} {:<20} {}{}",
            account.id.unwrap_or_default(),
            account.name,
            account.email,
            account.phone_number.as_deref().unwrap_or("-"),
            account.date_joined,
            if account.disabled { "  (disabled)" } else { "" },
        );
    }
    println!("{} accounts", accounts.len());

    Ok(())
}

fn run_show(db: &Database, id: i64) -> Result<()> {
    let account = commands::find_or_fail(db, id)?;
    println!("{}", serde_json::to_string_pretty(&account.to_dict())?);
    Ok(())
}
