use clap::{Parser, Subcommand};
use portfolio_cms::config::Config;
use portfolio_cms::models::db_operations::{admins_db_operations, DbError};
use portfolio_cms::setup::db_setup;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "Setup and admin tasks for the portfolio CMS.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Creates the SQLite file and every table. Safe to run twice.
    Setup,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        username: String,
        #[arg(long)]
        new_password: String,
    },
    ChangeUsername {
        #[arg(long)]
        old_username: String,
        #[arg(long)]
        new_username: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::from_env(&cli.env_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup => setup_database(&config),
        },
        Commands::Admin { action } => {
            let Some(conn) = open_database(&config) else {
                return;
            };
            match action {
                AdminAction::Create { username, password } => {
                    match admins_db_operations::create_admin(&conn, username, password) {
                        Ok(()) => println!("✅ Admin user '{}' created successfully.", username),
                        Err(e) => eprintln!("❌ Error creating admin user: {}. The username may already exist.", e),
                    }
                }
                AdminAction::List => list_admins(&conn),
                AdminAction::ChangePassword { username, new_password } => {
                    match admins_db_operations::change_password(&conn, username, new_password) {
                        Ok(()) => println!("✅ Password for admin user '{}' changed successfully.", username),
                        Err(DbError::NotFound(_)) => eprintln!("❌ Error: No admin user named '{}' found.", username),
                        Err(e) => eprintln!("❌ Error updating password: {}", e),
                    }
                }
                AdminAction::ChangeUsername { old_username, new_username } => {
                    match admins_db_operations::rename_admin(&conn, old_username, new_username) {
                        Ok(()) => println!("✅ Admin username changed from '{}' to '{}'.", old_username, new_username),
                        Err(DbError::NotFound(_)) => eprintln!("❌ Error: No admin user named '{}' found.", old_username),
                        Err(e) => eprintln!("❌ Error changing username: {}. The new username might already be taken.", e),
                    }
                }
            }
        }
    }
}

fn setup_database(config: &Config) {
    let db_path = config.database_path();
    println!("Setting up database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent_dir) {
            eprintln!("❌ Could not create database directory: {}", e);
            return;
        }
    }

    let result = Connection::open(&db_path)
        .map_err(db_setup::SetupError::from)
        .and_then(|mut conn| db_setup::setup_database(&mut conn));
    match result {
        Ok(()) => println!("✅ Database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up database: {}", e),
    }
}

fn open_database(config: &Config) -> Option<Connection> {
    let db_path = config.database_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    match Connection::open(&db_path) {
        Ok(conn) => Some(conn),
        Err(e) => {
            eprintln!("❌ Could not open database: {}", e);
            None
        }
    }
}

fn list_admins(conn: &Connection) {
    match admins_db_operations::read_all_admins(conn) {
        Ok(admins) => {
            println!("Listing Admin Users:");
            for admin in admins {
                println!("- {} (created {})", admin.username, admin.created_at.format("%Y-%m-%d"));
            }
        }
        Err(e) => eprintln!("❌ Error fetching admins: {}", e),
    }
}
