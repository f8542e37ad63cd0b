//! Cats Tapper - Main Entry Point
//!
//! Runs the mini-app automation loop for one Telegram account.

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Input, Password};
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

use cats_tapper::config::{AnswerBook, TapperSettings, TelegramConfig};
use cats_tapper::tapper::agents::random_android_chrome;
use cats_tapper::tapper::{
    Pacing, ProxySpec, RequestConfig, Session, Tapper, TelegramAuthenticator,
};
use cats_tapper::telegram::{TelegramClient, TelegramError};

/// Telegram mini-app automation client.
#[derive(Parser, Debug)]
#[command(name = "cats_tapper")]
#[command(about = "Automate the Cats mini app for one Telegram account")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Sign in interactively to create the session file, then exit.
    #[arg(long)]
    login: bool,

    /// Generate an example answers file and exit.
    #[arg(long)]
    generate_answers: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if args.generate_answers {
        return generate_example_answers();
    }

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    if args.login {
        return login(&tg_config).await;
    }

    let settings = TapperSettings::from_env_with_defaults(tg_config.session_name())
        .context("Failed to load tapper settings")?;

    let proxy = settings
        .proxy
        .as_deref()
        .map(str::parse::<ProxySpec>)
        .transpose()
        .context("Failed to parse PROXY")?;

    let answers = match AnswerBook::load_from_file(&settings.answers_path) {
        Ok(book) => {
            info!("Loaded {} quiz answers", book.len());
            book
        }
        Err(e) => {
            warn!(
                "Could not load answers from {}: {}. Quiz tasks will be skipped.",
                settings.answers_path.display(),
                e
            );
            AnswerBook::default()
        }
    };

    let user_agent = settings
        .fake_user_agent
        .then(|| random_android_chrome(&mut rand::thread_rng()));

    let request = RequestConfig::default()
        .user_agent(user_agent)
        .proxy(proxy.clone());

    let session_name = settings.session_name.clone();
    let authenticator =
        TelegramAuthenticator::new(tg_config, settings.referral_code.clone());
    let tapper = Tapper::new(
        Session::new(session_name.clone(), proxy),
        authenticator,
        request,
        answers,
        Pacing::from_settings(&settings),
    );

    info!("Starting tapper...");
    if let Some(proxy) = &tapper.session().proxy {
        info!("Using proxy: {}", proxy);
    }

    let run = tapper
        .run()
        .instrument(info_span!("tapper", session = %session_name));

    tokio::select! {
        result = run => {
            if let Err(e) = result {
                error!("{}", e);
                return Err(e).context("Tapper stopped");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Generates an example answers file.
fn generate_example_answers() -> Result<()> {
    let example = AnswerBook::example();
    example.save_to_file("youtube_answers.example.json")?;

    println!("✓ Example answers written to: youtube_answers.example.json");
    println!("\nTo use this tapper:");
    println!("1. Copy youtube_answers.example.json to youtube_answers.json");
    println!("2. Create a .env file with TG_API_ID, TG_API_HASH and REF_ID");
    println!("3. Run: cats_tapper --login");
    println!("4. Run: cats_tapper");

    Ok(())
}

/// Signs in interactively so the session file can be reused by the loop.
async fn login(config: &TelegramConfig) -> Result<()> {
    let client = TelegramClient::connect(config)
        .await
        .context("Failed to connect to Telegram")?;

    let result = authenticate(&client, config).await;
    client.disconnect();
    result
}

async fn authenticate(client: &TelegramClient, config: &TelegramConfig) -> Result<()> {
    if client.is_authorized().await.context("Failed to check authorization")? {
        info!("Session {} is already authorized", config.session_path.display());
        return Ok(());
    }

    info!("Authentication required");

    let phone: String = Input::new()
        .with_prompt("Enter your phone number (with country code)")
        .interact_text()?;

    let token = client
        .request_login_code(&phone, &config.api_hash)
        .await
        .context("Failed to request login code")?;

    info!("Login code sent to your Telegram app");

    let code: String = Input::new()
        .with_prompt("Enter the login code")
        .interact_text()?;

    match client.sign_in(&token, &code).await {
        Ok(()) => {
            info!("Successfully signed in!");
            Ok(())
        }
        Err(TelegramError::PasswordRequired(password_token)) => {
            info!("Two-factor authentication is enabled");

            let hint = password_token.hint().unwrap_or("no hint");
            info!("Password hint: {}", hint);

            let password: String = Password::new()
                .with_prompt("Enter your 2FA password")
                .interact()?;

            client
                .check_password(password_token, &password)
                .await
                .context("2FA authentication failed")?;

            info!("Successfully signed in with 2FA!");
            Ok(())
        }
        Err(e) => Err(e).context("Authentication failed"),
    }
}
