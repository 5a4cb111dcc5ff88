// Quill - A minimal multi-user blog built with Rust
// Copyright (C) 2025 Quill Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use quill_core::models::user::User;
use quill_db::repositories::UserRepository;
use sqlx::SqlitePool;
use std::io::Write;

const DEFAULT_DATABASE_URL: &str = "sqlite:quill.db";

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill CLI tool for database and user management")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database (create tables)
    Init,

    /// User management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a new user
    Create {
        /// Username
        username: String,
        /// Email address
        email: String,
        /// Make user staff
        #[arg(long)]
        staff: bool,
        /// Password (will prompt if not provided)
        #[arg(long)]
        password: Option<String>,
    },

    /// Change user password
    Password {
        /// Username
        username: String,
        /// New password (will prompt if not provided)
        #[arg(long)]
        password: Option<String>,
    },

    /// Grant or revoke staff rights
    Staff {
        /// Username
        username: String,
        /// Revoke instead of grant
        #[arg(long)]
        revoke: bool,
    },

    /// List all users
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    match cli.command {
        Commands::Init => init_database(&database_url).await,
        Commands::User { command } => {
            let pool = quill_db::init_database(&database_url).await?;
            handle_user_command(command, pool).await
        }
    }
}

async fn init_database(database_url: &str) -> Result<()> {
    println!("Initializing database at: {}", database_url);
    quill_db::init_database(database_url).await?;
    println!("Database initialized successfully!");
    Ok(())
}

fn prompt_password(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    rpassword::read_password().context("Failed to read password")
}

async fn find_user(user_repo: &UserRepository, username: &str) -> Result<User> {
    user_repo
        .find_by_username(&username.trim().to_lowercase())
        .await?
        .ok_or_else(|| anyhow!("User not found: {}", username))
}

async fn handle_user_command(command: UserCommands, pool: SqlitePool) -> Result<()> {
    let user_repo = UserRepository::new(pool);

    match command {
        UserCommands::Create {
            username,
            email,
            staff,
            password,
        } => {
            let username = username.trim().to_lowercase();
            println!("Creating user: {} ({})", username, email);

            let password = match password {
                Some(pwd) => pwd,
                None => prompt_password("Password: ")?,
            };

            let mut user = User::new(&username, email.trim(), &password)?;
            user.is_staff = staff;

            if let Err(e) = user.is_valid() {
                anyhow::bail!("Invalid user data: {}", e);
            }

            let user_id = user_repo
                .create(&user)
                .await
                .context("Failed to create user")?;

            println!("User created successfully with ID: {}", user_id);
            if staff {
                println!("User has staff privileges");
            }
            Ok(())
        }
        UserCommands::Password { username, password } => {
            println!("Changing password for {}", username);
            let mut user = find_user(&user_repo, &username).await?;

            let password = match password {
                Some(p) => p,
                None => prompt_password("New password: ")?,
            };

            user.set_password(&password)?;
            user_repo.update(&user).await?;

            println!("Password changed successfully!");
            Ok(())
        }
        UserCommands::Staff { username, revoke } => {
            let mut user = find_user(&user_repo, &username).await?;
            user.is_staff = !revoke;
            user_repo.update(&user).await?;

            if revoke {
                println!("Staff rights revoked from {}", user.username);
            } else {
                println!("Staff rights granted to {}", user.username);
            }
            Ok(())
        }
        UserCommands::List => {
            let users = user_repo.list_all().await?;
            if users.is_empty() {
                println!("No users found.");
                return Ok(());
            }
            for user in users {
                println!(
                    "{:<25} {:<35} {}{}",
                    user.username,
                    user.email,
                    if user.is_staff { "staff" } else { "user" },
                    if user.is_active { "" } else { " (inactive)" }
                );
            }
            Ok(())
        }
    }
}
