use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ft_cli::commands::{
    categories, load_history, open_tracker, report, status, write_unreadable,
};
use ft_cli::{CategoriesAction, Cli, Commands, Config};

fn today() -> i32 {
    ft_core::date_id(&chrono::Local::now())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let tracker = open_tracker(&config)?;
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Status => {
            let history = load_history(&tracker, &config, today());
            status::run(&mut stdout, &config, &tracker, &history)?;
        }
        Commands::Report {
            group_by,
            filter,
            json,
        } => {
            let history = load_history(&tracker, &config, today());
            write_unreadable(&mut std::io::stderr().lock(), &history)?;
            let filters: HashMap<String, String> = filter.iter().cloned().collect();
            report::run(&mut stdout, &tracker, group_by, &filters, *json)?;
        }
        Commands::Categories(action) => match action {
            CategoriesAction::List { json } => categories::list(&mut stdout, &tracker, *json)?,
            CategoriesAction::Create { name } => categories::create(&mut stdout, &tracker, name)?,
            CategoriesAction::Set {
                identifier,
                category,
                app,
            } => categories::set(&mut stdout, &tracker, identifier, category, *app)?,
            CategoriesAction::Unset { identifier } => {
                categories::unset(&mut stdout, &tracker, identifier)?;
            }
            CategoriesAction::Reorder { names } => {
                categories::reorder(&mut stdout, &tracker, names)?;
            }
        },
    }

    Ok(())
}
