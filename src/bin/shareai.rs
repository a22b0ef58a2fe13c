//! # ShareAI CLI Entry Point
//!
//! Terminal front end for the ShareAI image platform. Each screen of the
//! web UI maps to a subcommand:
//!
//! ```bash
//! shareai register alice alice@example.com --password secret1
//! shareai login alice --password secret1
//! shareai images --search llama --label cv --label gpu
//! shareai collect 4f7c...
//! shareai profile update --nickname "Alice" --avatar ./me.png
//! shareai deploy 4f7c... --provider aws-1 --param replicas=2
//! shareai logout
//! ```
//!
//! The CLI will:
//! 1. Load configuration (TOML file, defaults, `SHAREAI_API_URL` override)
//! 2. Open the session store and subscribe to session changes
//! 3. Wire the HTTP client and the auth/catalog operation clients
//! 4. Run the requested command and render the result
//! 5. Track request metrics and export to JSON (if `--metrics-output` given)

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{info, LevelFilter};
use std::io::Write;

use shareai::client::catalog::filter_by_labels;
use shareai::common::models::{ContainerImage, DeployRequest, ImageQuery, User};
use shareai::{ApiClient, ApiError, AuthClient, CatalogClient, ClientConfig, ClientMetrics, Session};

/// Command-line arguments for the ShareAI client
#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal client for the ShareAI image platform", long_about = None)]
struct Args {
    /// Path to the client configuration file (TOML format)
    ///
    /// Example: config/shareai.toml
    #[arg(short, long)]
    config: Option<String>,

    /// Path to write request metrics JSON output (optional)
    #[arg(long)]
    metrics_output: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and establish a session
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and log in
    Register {
        username: String,
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log out and clear the local session
    Logout,
    /// Show or update your profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Browse the image catalog
    Images {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
        /// Free-text search over name and description
        #[arg(long, default_value = "")]
        search: String,
        /// Keep only images carrying every given label (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,
    },
    /// List the images you have collected
    Favorites {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    /// Star an image
    Collect { image_id: String },
    /// Remove your star from an image
    Uncollect { image_id: String },
    /// Fetch or request provider deployment parameters for an image
    Deploy {
        image_id: String,
        #[arg(long)]
        provider: String,
        /// Provider parameter as key=value (repeatable)
        #[arg(long = "param")]
        params: Vec<String>,
        /// Only fetch the configured parameters, do not request a deployment
        #[arg(long)]
        info: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Show the current profile
    Show,
    /// Update nickname and/or avatar
    Update {
        #[arg(long)]
        nickname: Option<String>,
        /// Path to an image file to upload as the new avatar
        #[arg(long)]
        avatar: Option<String>,
    },
}

/// Initialize the logging system with timestamp, level, and message formatting.
///
/// Logs are printed to stderr with INFO level by default; `RUST_LOG`
/// overrides the level.
fn init_logger() {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();

    // Load configuration (file, defaults, environment override)
    let config = ClientConfig::resolve(args.config.as_deref())?;

    // Open the session store and mirror session changes into the log, the
    // way the web views reflected them in the header
    let session = Session::open(Path::new(&config.storage.state_dir))?;
    let _session_watch = session.subscribe(|user| match user {
        Some(user) => info!("session: signed in as '{}'", user.username),
        None => info!("session: signed out"),
    });

    // Wire the HTTP client and the operation clients
    let api = Arc::new(ApiClient::new(&config.api, session.clone())?);
    let auth = AuthClient::new(Arc::clone(&api));
    let catalog = CatalogClient::new(Arc::clone(&api));

    let operation = operation_name(&args.command);
    let mut metrics = args
        .metrics_output
        .as_ref()
        .map(|_| ClientMetrics::new(operation.to_string()));

    // Run the requested command
    let started = Instant::now();
    let result = run_command(args.command, &auth, &catalog).await;

    if let Some(metrics) = metrics.as_mut() {
        metrics.record_request(
            operation,
            started.elapsed(),
            result.is_ok(),
            result.as_ref().err().map(|e| e.to_string()),
        );
        if let Some(path) = args.metrics_output.as_ref() {
            metrics.export_to_json(path)?;
            info!("metrics exported to {}", path);
        }
    }

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("❌ {}", e.user_message());
            if e.requires_login() {
                eprintln!("Run `shareai login <username> --password <password>` to sign in.");
            }
            std::process::exit(1);
        }
    }
}

async fn run_command(
    command: Command,
    auth: &AuthClient,
    catalog: &CatalogClient,
) -> Result<(), ApiError> {
    match command {
        Command::Login { username, password } => {
            validate_login(&username, &password)?;
            let response = auth.login(&username, &password).await?;
            println!("✅ Logged in as '{}'", response.user.username);
            Ok(())
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            validate_register(&username, &email, &password)?;
            let response = auth.register(&username, &email, &password).await?;
            println!("✅ Registered and logged in as '{}'", response.user.username);
            Ok(())
        }
        Command::Logout => {
            auth.logout().await?;
            println!("Logged out.");
            Ok(())
        }
        Command::Profile { action } => match action {
            ProfileAction::Show => {
                let user = auth.get_profile().await?;
                print_user(&user);
                Ok(())
            }
            ProfileAction::Update { nickname, avatar } => {
                if nickname.is_none() && avatar.is_none() {
                    return Err(ApiError::Validation(
                        "nothing to update: pass --nickname and/or --avatar".to_string(),
                    ));
                }
                let user = auth
                    .update_profile(nickname.as_deref(), avatar.as_deref().map(Path::new))
                    .await?;
                println!("✅ Profile updated");
                print_user(&user);
                Ok(())
            }
        },
        Command::Images {
            page,
            page_size,
            search,
            labels,
        } => {
            let query = ImageQuery {
                page,
                page_size,
                search,
            };
            let result = catalog.list_images(&query).await?;
            let shown = filter_by_labels(&result.items, &labels);

            for image in &shown {
                print_image_line(image);
            }
            if labels.is_empty() {
                println!(
                    "Showing {} of {} images (page {})",
                    shown.len(),
                    result.total,
                    page
                );
            } else {
                println!(
                    "Showing {} of {} images on page {} matching labels [{}]",
                    shown.len(),
                    result.items.len(),
                    page,
                    labels.join(", ")
                );
            }
            Ok(())
        }
        Command::Favorites { page, page_size } => {
            let result = catalog.list_favorites(page, page_size).await?;
            for image in &result.items {
                print_image_line(image);
            }
            println!(
                "Showing {} of {} collected images (page {})",
                result.items.len(),
                result.total,
                page
            );
            Ok(())
        }
        Command::Collect { image_id } => {
            catalog.collect(&image_id).await?;
            println!("⭐ Collected {image_id}");
            Ok(())
        }
        Command::Uncollect { image_id } => {
            catalog.uncollect(&image_id).await?;
            println!("Removed star from {image_id}");
            Ok(())
        }
        Command::Deploy {
            image_id,
            provider,
            params,
            info,
        } => {
            let response = if info {
                catalog.deploy_info(&image_id, &provider).await?
            } else {
                let request = DeployRequest {
                    provider_id: provider,
                    params: parse_params(&params)?,
                };
                catalog.deploy(&image_id, &request).await?
            };
            println!("Provider: {}", response.provider_name);
            println!("API URL:  {}", response.api_url);
            if !response.params.is_empty() {
                println!(
                    "Params:   {}",
                    serde_json::to_string_pretty(&response.params)
                        .unwrap_or_else(|_| "<unprintable>".to_string())
                );
            }
            Ok(())
        }
    }
}

/// Form-level validation, applied before anything touches the network.
/// Mirrors the backend's binding rules so obvious mistakes fail fast.
fn validate_login(username: &str, password: &str) -> Result<(), ApiError> {
    if username.trim().is_empty() {
        return Err(ApiError::Validation("username must not be empty".to_string()));
    }
    if password.is_empty() {
        return Err(ApiError::Validation("password must not be empty".to_string()));
    }
    Ok(())
}

fn validate_register(username: &str, email: &str, password: &str) -> Result<(), ApiError> {
    if username.trim().len() < 3 {
        return Err(ApiError::Validation(
            "username must be at least 3 characters".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation(format!("'{email}' is not a valid email")));
    }
    if password.len() < 6 {
        return Err(ApiError::Validation(
            "password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

/// Parse repeated `key=value` provider parameters.
fn parse_params(
    raw: &[String],
) -> Result<serde_json::Map<String, serde_json::Value>, ApiError> {
    let mut params = serde_json::Map::new();
    for entry in raw {
        let (key, value) = entry.split_once('=').ok_or_else(|| {
            ApiError::Validation(format!("invalid parameter '{entry}', expected key=value"))
        })?;
        params.insert(
            key.to_string(),
            serde_json::Value::String(value.to_string()),
        );
    }
    Ok(params)
}

fn operation_name(command: &Command) -> &'static str {
    match command {
        Command::Login { .. } => "login",
        Command::Register { .. } => "register",
        Command::Logout => "logout",
        Command::Profile {
            action: ProfileAction::Show,
        } => "get_profile",
        Command::Profile {
            action: ProfileAction::Update { .. },
        } => "update_profile",
        Command::Images { .. } => "list_images",
        Command::Favorites { .. } => "list_favorites",
        Command::Collect { .. } => "collect",
        Command::Uncollect { .. } => "uncollect",
        Command::Deploy { .. } => "deploy",
    }
}

fn print_user(user: &User) {
    println!("id:       {}", user.id);
    println!("username: {}", user.username);
    println!("email:    {}", user.email);
    println!("nickname: {}", user.nickname);
    println!(
        "avatar:   {}",
        if user.avatar.is_empty() {
            "<none>"
        } else {
            &user.avatar
        }
    );
    println!("role:     {:?}", user.role);
}

fn print_image_line(image: &ContainerImage) {
    let labels = image
        .labels
        .iter()
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    println!(
        "{}  {:<24} {:<40} ⭐{:<5} [{}]",
        image.id,
        image.name,
        image.reference(),
        image.stars,
        labels
    );
}
