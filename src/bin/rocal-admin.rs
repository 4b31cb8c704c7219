use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Password};
use tracing_subscriber::EnvFilter;

use rocal_admin::filter::FilterField;
use rocal_admin::prelude::*;
use rocal_admin::stats::money;
use rocal_admin::{DashboardConfig, RocalAdmin, SupabaseStore};

#[derive(Parser)]
#[command(name = "rocal-admin")]
#[command(version, about = "Manage Rocal suppliers, materials and piece-work jobs")]
struct Cli {
    /// Log HTTP traffic and state changes
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Read from the prompt when omitted
        #[arg(long, env = "ROCAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// List the records of a tab
    List {
        #[arg(default_value = "suppliers")]
        tab: RecordKind,
        /// Name contains
        #[arg(long)]
        search: Option<String>,
        /// Notes contain
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        min: Option<String>,
        #[arg(long)]
        max: Option<String>,
    },
    /// Show totals for a tab
    Stats {
        #[arg(default_value = "suppliers")]
        tab: RecordKind,
    },
    /// Add a record, e.g. `add materials --set name=Cemento --set price=250`
    Add {
        tab: RecordKind,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        values: Vec<String>,
    },
    /// Change fields of a record
    Edit {
        tab: RecordKind,
        id: String,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        values: Vec<String>,
    },
    /// Delete a record after confirmation
    Delete {
        tab: RecordKind,
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = DashboardConfig::from_env().context("Failed to read configuration")?;
    let app = RocalAdmin::connect(config).await?;

    match cli.command {
        Commands::Login { email, password } => cmd_login(&app, email, password).await,
        Commands::Logout => {
            app.session().logout().await;
            println!("Signed out");
            Ok(())
        }
        Commands::Whoami => {
            match app.session().identity() {
                Some(identity) => println!("{}", identity.display_name()),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        command => {
            let mut dashboard = open_dashboard(&app).await?;
            let result = run_dashboard_command(&mut dashboard, command).await;
            flush_notifications(&mut dashboard)?;
            result
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "rocal_admin=debug,rocal_auth=debug,rocal_postgrest=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_login(
    app: &RocalAdmin,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let handle = app.session().handle();
    if let Navigation::Redirect(Route::Dashboard) = resolve(Route::Login.path(), &handle) {
        if let Some(identity) = app.session().identity() {
            println!("Already signed in as {}", identity.display_name());
        }
        return Ok(());
    }

    let email = match email {
        Some(email) => email,
        None => Input::new().with_prompt("Email").interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };

    match app.session().login(&email, &password).await {
        Ok(signed_in) => {
            println!("Welcome! Signed in as {}", signed_in.identity.display_name());
            if let Some(expires_at) = signed_in.expires_at {
                tracing::debug!(%expires_at, "session expiry");
            }
            Ok(())
        }
        Err(failure) => bail!("Authentication error: {}", failure),
    }
}

async fn open_dashboard(app: &RocalAdmin) -> Result<DashboardController<SupabaseStore>> {
    let handle = app.session().handle();
    match resolve(Route::Dashboard.path(), &handle) {
        Navigation::Render(Route::Dashboard) => {}
        _ => bail!("Not signed in. Run `rocal-admin login` first."),
    }

    let mut dashboard = app.dashboard();
    if let Some(identity) = handle.current() {
        eprintln!("Rocal admin · {}", identity.display_name());
    }
    dashboard.load().await;
    Ok(dashboard)
}

async fn run_dashboard_command(
    dashboard: &mut DashboardController<SupabaseStore>,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::List {
            tab,
            search,
            notes,
            min,
            max,
        } => {
            dashboard.set_active_tab(tab);
            let filters = [
                (FilterField::Search, search),
                (FilterField::Notes, notes),
                (FilterField::MinPrice, min),
                (FilterField::MaxPrice, max),
            ];
            for (field, value) in filters {
                if let Some(value) = value {
                    dashboard.set_filter(field, value);
                }
            }

            println!("{}", tab);
            if !dashboard.filter().is_empty() {
                println!("Filters: {}", dashboard.filter());
            }
            println!();
            print!("{}", dashboard.list().view());
            let stats = dashboard.aggregates();
            println!();
            println!(
                "{} of {} shown, total {}",
                dashboard.visible().len(),
                stats.count,
                money(stats.total)
            );
            Ok(())
        }
        Commands::Stats { tab } => {
            dashboard.set_active_tab(tab);
            print!("{}", dashboard.aggregates());
            Ok(())
        }
        Commands::Add { tab, values } => {
            dashboard.set_active_tab(tab);
            let form = dashboard.open_create();
            fill_form(form, &values)?;
            submit(dashboard).await
        }
        Commands::Edit { tab, id, values } => {
            dashboard.set_active_tab(tab);
            let id = RecordId::new(id);
            let Some(form) = dashboard.open_edit(&id) else {
                bail!("No {} record with id {}", tab, id);
            };
            fill_form(form, &values)?;
            submit(dashboard).await
        }
        Commands::Delete { tab, id, yes } => {
            dashboard.set_active_tab(tab);
            let id = RecordId::new(id);
            let Some(confirmation) = dashboard.list().request_delete(&id) else {
                bail!("No {} record with id {}", tab, id);
            };

            let confirmed = yes
                || Confirm::new()
                    .with_prompt(confirmation.message())
                    .default(false)
                    .interact()
                    .unwrap_or(false);
            if !confirmed {
                confirmation.dismiss();
                println!("Delete cancelled");
                return Ok(());
            }

            confirmation.confirm(move |id| dashboard.delete(id)).await;
            Ok(())
        }
        Commands::Login { .. } | Commands::Logout | Commands::Whoami => Ok(()),
    }
}

fn fill_form(form: &mut RecordForm, values: &[String]) -> Result<()> {
    for pair in values {
        let Some((field, value)) = pair.split_once('=') else {
            bail!("Expected FIELD=VALUE, got '{}'", pair);
        };
        form.set(field.trim(), value)?;
    }
    Ok(())
}

async fn submit(dashboard: &mut DashboardController<SupabaseStore>) -> Result<()> {
    if !dashboard.submit_form().await {
        if let Some(form) = dashboard.form() {
            tracing::debug!(title = %form.title(), "form left open");
        }
    }
    Ok(())
}

/// Prints pending notifications; any error makes the command fail.
fn flush_notifications(dashboard: &mut DashboardController<SupabaseStore>) -> Result<()> {
    let notifications = dashboard.notifications_mut().drain();
    let mut failed = false;
    for notification in &notifications {
        match notification.level {
            rocal_admin::notify::Level::Success => println!("{}", notification),
            rocal_admin::notify::Level::Error => {
                failed = true;
                eprintln!("{}", notification);
            }
        }
    }
    if failed {
        bail!("Command failed");
    }
    Ok(())
}
