use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use viya_idp_cli::commands::{authorize, check, claims, hash};

#[derive(Parser)]
#[command(
    name = "viya-idp",
    version,
    about = "viya-idp CLI: validate and inspect identity provider configuration"
)]
struct Cli {
    /// Configuration file (defaults to the built-in sample tenant)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration
    Check,
    /// Hash a secret for a configuration file
    Hash {
        /// Plaintext secret
        secret: String,
        /// Hash algorithm
        #[arg(long, value_enum, default_value_t = hash::HashAlgorithm::Argon2)]
        algorithm: hash::HashAlgorithm,
    },
    /// Dry-run a grant request against a client
    Authorize {
        /// Client id
        client: String,
        /// Grant type wire name (e.g. client_credentials, authorization_code)
        #[arg(long)]
        grant: String,
        /// Requested scope (repeatable)
        #[arg(long = "scope")]
        scopes: Vec<String>,
        /// Redirect URI presented by the client
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// Show the claims released to a user for the given scopes
    Claims {
        /// Username
        username: String,
        /// Requested scope (repeatable)
        #[arg(long = "scope")]
        scopes: Vec<String>,
    },
}

fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Check => check::run(config),
        Commands::Hash { secret, algorithm } => hash::run(&secret, algorithm),
        Commands::Authorize {
            client,
            grant,
            scopes,
            redirect_uri,
        } => authorize::run(config, &client, &grant, &scopes, redirect_uri.as_deref()),
        Commands::Claims { username, scopes } => claims::run(config, &username, &scopes),
    };

    if let Err(e) = result {
        eprintln!("{}", colored::Colorize::red(format!("Error: {e}").as_str()));
        std::process::exit(1);
    }
}
