//! WeatherVK: saved-city weather list for the terminal.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use weathervk_core::{App, AppError, Config};
use weathervk_store::WeatherStore;
use weathervk_ui::{bridge, ReloadDelegate, WeatherController};

/// Current weather for saved cities and the configured location
#[derive(Parser)]
#[command(name = "weathervk", version, about)]
struct Cli {
    /// Directory holding config.toml and weather.db
    #[arg(long, env = "WEATHERVK_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show saved cities without fetching
    List,
    /// Look up a city by name and save its current weather
    Add {
        #[arg(required = true)]
        city: Vec<String>,
    },
    /// Remove a saved city
    Remove {
        #[arg(required = true)]
        city: Vec<String>,
    },
    /// Remove every saved city
    Clear,
    /// Re-fetch weather for every saved city
    Refresh,
    /// Show weather for the configured location
    Here,
}

/// Logs whenever the saved list changes
struct ListChanged;

impl ReloadDelegate for ListChanged {
    fn reload_collection(&mut self) {
        tracing::debug!("City list changed");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    weathervk_core::init()?;

    let mut app = App::open(cli.config_dir.as_deref())?;
    for warning in &app.warnings().warnings {
        eprintln!("warning: {}", warning);
    }
    let config = app.shared_config();
    let store = WeatherStore::open(&app.database_path())
        .with_context(|| format!("Failed to open {}", app.database_path().display()))?;

    let mut controller = WeatherController::from_config(&config, store)?;
    controller.set_reload_delegate(Box::new(ListChanged));
    let budget = bridge::request_budget(&config);

    match cli.command {
        Some(Command::List) => print_rows(&controller)?,
        Some(Command::Add { city }) => {
            let name = city.join(" ");
            if !controller.on_search_submitted(&name) {
                anyhow::bail!("City name must not be empty");
            }
            finish(&mut controller, budget);
            print_rows(&controller)?;
        }
        Some(Command::Remove { city }) => {
            let name = city.join(" ");
            if controller.delete_city(&name)? {
                println!("Removed {}", name);
            } else {
                println!("{} is not in the list", name);
            }
        }
        Some(Command::Clear) => {
            let removed = controller.clear()?;
            println!("Removed {} cities", removed);
        }
        Some(Command::Refresh) => {
            controller.on_load()?;
            finish(&mut controller, budget);
            print_rows(&controller)?;
        }
        Some(Command::Here) => {
            if !here(&mut controller, &config, budget) {
                println!("Location is not available. Set [location] in config.toml.");
            }
        }
        None => {
            controller.on_load()?;
            let has_header = here(&mut controller, &config, budget);
            finish(&mut controller, budget);
            if has_header {
                println!();
            }
            print_rows(&controller)?;
        }
    }

    app.shutdown()?;
    Ok(())
}

/// Deliver the configured location to the controller and print the header.
/// Returns false when no location is configured.
fn here(controller: &mut WeatherController, config: &Config, budget: Duration) -> bool {
    let source = bridge::location_source(config);
    controller.on_location_update(source.current_update());
    if !controller.header_visible() {
        return false;
    }

    finish(controller, budget);
    if let Some(row) = controller.current_location() {
        println!("{}", row);
    }
    true
}

fn finish(controller: &mut WeatherController, budget: Duration) {
    if !controller.wait_idle(budget) {
        eprintln!("Some requests did not finish in time");
    }
    if let Some(error) = controller.take_error() {
        report(&error);
    }
}

fn report(error: &AppError) {
    tracing::debug!("Last error: {:?}", error);
    eprintln!("{}", error.user_message());
}

fn print_rows(controller: &WeatherController) -> Result<()> {
    let rows = controller.rows()?;
    if rows.is_empty() {
        println!("No saved cities. Add one with `weathervk add <city>`.");
    }
    for row in rows {
        println!("{}", row);
    }
    Ok(())
}
