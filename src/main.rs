// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subtrack command-line client
//!
//! Logs in with a one-time passcode and manages the user's tracked
//! subscriptions against the backend.

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use subtrack::{
    config::Config,
    error::AppError,
    models::{BillingCycle, OtpIdentifier, SignupForm, Subscription, SubscriptionCategory},
    services::{AuthState, FileTokenStore, ResendOutcome},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Track recurring subscriptions and monthly spend
#[derive(Parser)]
#[command(name = "subtrack", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account (log in afterwards with `login`)
    Signup(SignupArgs),

    /// Log in with a one-time passcode sent by email or SMS
    Login(LoginArgs),

    /// Forget the stored session
    Logout,

    /// List all subscriptions
    List,

    /// Monthly spend, category breakdown, and upcoming payments
    Summary,

    /// Track a new subscription
    Add(AddArgs),

    /// Change the price of a subscription
    UpdatePrice {
        id: String,
        price: f64,
    },

    /// Stop counting a subscription without deleting it
    Deactivate { id: String },

    /// Delete a subscription
    Delete { id: String },
}

#[derive(Args)]
struct SignupArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: String,
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long, conflicts_with = "phone")]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    /// Country code for phone logins (defaults to config)
    #[arg(long, requires = "phone")]
    country_code: Option<String>,
}

#[derive(Args)]
struct AddArgs {
    #[arg(long)]
    name: String,
    /// streaming, music, gaming, productivity, software, education, health, other
    #[arg(long, default_value = "other")]
    category: SubscriptionCategory,
    #[arg(long)]
    price: f64,
    /// weekly, monthly, quarterly, yearly
    #[arg(long, default_value = "monthly")]
    cycle: BillingCycle,
    /// Next renewal date (YYYY-MM-DD)
    #[arg(long)]
    renewal: NaiveDate,
    #[arg(long)]
    notes: Option<String>,
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let message = match e.downcast_ref::<AppError>() {
            Some(app) => app.user_message(),
            None => format!("{:#}", e),
        };
        eprintln!("error: {}", message);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(base_url = %config.api_base_url, "Configuration loaded");

    let token_store = Arc::new(FileTokenStore::new(&config.token_path));
    let app = AppState::new(config, token_store).context("Failed to build API client")?;

    match cli.command {
        Commands::Signup(args) => signup(&app, args).await,
        Commands::Login(args) => login(&app, args).await,
        Commands::Logout => {
            app.session.logout();
            println!("Logged out.");
            Ok(())
        }
        Commands::List => {
            app.subscriptions.fetch_all().await?;
            print_list(&app.subscriptions.subscriptions());
            Ok(())
        }
        Commands::Summary => summary(&app).await,
        Commands::Add(args) => add(&app, args).await,
        Commands::UpdatePrice { id, price } => {
            app.subscriptions.fetch_all().await?;
            let mut sub = app
                .subscriptions
                .get(&id)
                .with_context(|| format!("No subscription with id {}", id))?;
            sub.price = price;
            sub.updated_at = Utc::now();
            let updated = app.subscriptions.update(sub).await?;
            println!(
                "Updated {}: {:.2}{}",
                updated.name,
                updated.price,
                updated.billing_cycle.abbreviation()
            );
            Ok(())
        }
        Commands::Deactivate { id } => {
            app.subscriptions.fetch_all().await?;
            let updated = app.subscriptions.deactivate(&id).await?;
            println!("Deactivated {}.", updated.name);
            Ok(())
        }
        Commands::Delete { id } => {
            app.subscriptions.delete(&id).await?;
            println!("Deleted {}.", id);
            Ok(())
        }
    }
}

async fn signup(app: &AppState, args: SignupArgs) -> anyhow::Result<()> {
    let password = prompt("Password: ")?;
    let confirm_password = prompt("Confirm password: ")?;
    let form = SignupForm {
        full_name: args.name,
        email: args.email,
        phone_number: args.phone,
        password,
        confirm_password,
    };

    app.session.signup(&form).await?;
    println!("Account created. Run `subtrack login --email {}` to sign in.", form.email);
    Ok(())
}

async fn login(app: &AppState, args: LoginArgs) -> anyhow::Result<()> {
    if app.session.is_authenticated() {
        println!("Already logged in. Run `subtrack logout` first to switch accounts.");
        return Ok(());
    }

    let identifier = match (args.email, args.phone) {
        (Some(email), _) => OtpIdentifier::email(email),
        (None, Some(phone)) => OtpIdentifier::phone(
            phone,
            args.country_code
                .unwrap_or_else(|| app.config.default_country_code.clone()),
        ),
        (None, None) => bail!("Either --email or --phone is required"),
    };

    app.session.send_otp(identifier).await?;
    println!("Code sent. Enter the 6-digit code, or `resend` to get a new one.");

    loop {
        let input = prompt("Code: ")?;
        if input.eq_ignore_ascii_case("resend") {
            match app.session.resend_otp().await {
                Ok(ResendOutcome::Sent) => println!("A new code is on its way."),
                Ok(ResendOutcome::CoolingDown { remaining_secs }) => {
                    println!("Please wait {}s before resending.", remaining_secs)
                }
                Err(e) => println!("{}", e.user_message()),
            }
            continue;
        }

        match app.session.verify_otp(&input).await {
            Ok(user) => {
                println!("Welcome, {}!", user.full_name);
                return Ok(());
            }
            Err(e @ (AppError::AuthRejected(_) | AppError::InvalidInput(_))) => {
                println!("{}", e.user_message());
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn add(app: &AppState, args: AddArgs) -> anyhow::Result<()> {
    let user_id = match app.session.auth_state() {
        AuthState::Authenticated { user: Some(user), .. } => user.id,
        _ => String::new(),
    };
    let renewal = args
        .renewal
        .and_hms_opt(0, 0, 0)
        .context("Invalid renewal date")?
        .and_utc();

    let mut sub = Subscription::new(
        user_id,
        args.name,
        args.category,
        args.price,
        args.cycle,
        renewal,
    );
    sub.notes = args.notes.filter(|n| !n.trim().is_empty());

    let created = app.subscriptions.add(sub).await?;
    println!("Added {} ({}).", created.name, created.id);
    Ok(())
}

async fn summary(app: &AppState) -> anyhow::Result<()> {
    app.subscriptions.fetch_all().await?;
    let summary = app.subscriptions.summary();

    println!("Active subscriptions: {}", summary.active_count);
    println!("Monthly spend:        {:.2}", summary.total_monthly);
    println!("Yearly spend:         {:.2}", summary.total_yearly);

    if !summary.by_category.is_empty() {
        println!();
        println!("By category:");
        for (category, monthly) in &summary.by_category {
            println!("  {:<14} {:>10.2}/Month", category.display_name(), monthly);
        }
    }

    let upcoming = app.subscriptions.upcoming_payments(Utc::now());
    if !upcoming.is_empty() {
        println!();
        println!("Upcoming payments:");
        for sub in &upcoming {
            println!(
                "  {}  {:<24} {:>8.2}",
                sub.renewal_date.format("%Y-%m-%d"),
                sub.name,
                sub.price
            );
        }
    }
    Ok(())
}

fn print_list(subscriptions: &[Subscription]) {
    if subscriptions.is_empty() {
        println!("No subscriptions yet.");
        return;
    }
    for sub in subscriptions {
        println!(
            "{}  {:<24} {:<12} {:>8.2}{:<9} renews {}{}",
            sub.id,
            sub.name,
            sub.category.display_name(),
            sub.price,
            sub.billing_cycle.abbreviation(),
            sub.renewal_date.format("%Y-%m-%d"),
            if sub.is_active { "" } else { "  (inactive)" }
        );
    }
}

/// Print `label` and read one trimmed line from stdin.
fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("Input closed");
    }
    Ok(line.trim().to_string())
}

/// Initialize logging to stderr: JSON when `LOG_FORMAT=json`, text otherwise.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("subtrack=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(io::stderr),
            )
            .init();
    }
}
