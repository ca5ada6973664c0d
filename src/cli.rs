use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "autoreg", about = "Automated chayns account registration & login verification")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a fresh account end to end
    Register {
        /// First name (random if omitted)
        #[arg(long)]
        first_name: Option<String>,

        /// Last name (random if omitted)
        #[arg(long)]
        last_name: Option<String>,

        /// Account password (configured default if omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Print the resulting credentials as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify an existing account by logging in
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Print the resulting credentials as JSON
        #[arg(long)]
        json: bool,
    },
}
