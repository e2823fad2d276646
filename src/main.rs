use std::{fs, path::PathBuf, process};

use clap::Parser;
use color_eyre::Result;
use dotdex::{
    cli::{Cli, CliProcess},
    config::Config,
    errors::{self, AppError},
    logging, output,
    service::{DotdexService, Explanation, MankierExplainer},
    storage::{CommandFilter, SqliteStorage},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse the arguments and load the config
    let cli = Cli::parse();
    let config = Config::init(cli.config.clone())?;

    // Initialize logging and error handling
    let log_path = logging::init(&config)?;
    errors::init(log_path)?;
    tracing::info!("dotdex v{}", env!("CARGO_PKG_VERSION"));

    // Showing the config doesn't need the storage
    if let CliProcess::Config(_) = cli.process {
        return show_config(cli.config);
    }

    // Prepare the storage and the service
    let storage = match SqliteStorage::new(&config.data_dir).await {
        Ok(storage) => storage,
        Err(err) => return Err(err.into_report()),
    };
    let service = DotdexService::new(storage, config);

    // Run the requested process
    match run(service, cli.process).await {
        Ok(()) => Ok(()),
        Err(AppError::UserFacing(err)) => {
            tracing::error!("{err}");
            eprintln!("{err}");
            process::exit(1);
        }
        Err(AppError::Unexpected(report)) => Err(report),
    }
}

async fn run(service: DotdexService, process: CliProcess) -> Result<(), AppError> {
    match process {
        CliProcess::Index(args) => {
            tracing::info!("Running 'index' process");
            tracing::debug!("Options: {args:?}");
            let report = service.index().await?;
            println!("{report}");
        }
        CliProcess::List(args) => {
            tracing::info!("Running 'list' process");
            tracing::debug!("Options: {args:?}");
            let filter = CommandFilter {
                category: args.category,
                kind: args.kind,
                only_hidden: args.hidden,
                include_hidden: args.all,
                include_orphaned: args.all,
                ..Default::default()
            };
            let commands = service.list_commands(filter).await?;
            if commands.is_empty() {
                println!("No commands to show, run `dotdex index` first");
            } else {
                output::commands_table(&commands).printstd();
            }
        }
        CliProcess::Search(args) => {
            tracing::info!("Running 'search' process");
            tracing::debug!("Options: {args:?}");
            let commands = service.search_commands(args).await?;
            if commands.is_empty() {
                println!("No commands matched");
            } else {
                output::commands_table(&commands).printstd();
            }
        }
        CliProcess::Hide(select) => {
            tracing::info!("Running 'hide' process");
            tracing::debug!("Options: {select:?}");
            let affected = service.hide_commands(select).await?;
            println!("{affected} command(s) hidden");
        }
        CliProcess::Unhide(select) => {
            tracing::info!("Running 'unhide' process");
            tracing::debug!("Options: {select:?}");
            let affected = service.unhide_commands(select).await?;
            println!("{affected} command(s) unhidden");
        }
        CliProcess::Edit(args) => {
            tracing::info!("Running 'edit' process");
            tracing::debug!("Options: {args:?}");
            let command = service.edit_command(args).await?;
            output::command_details(&command).printstd();
        }
        CliProcess::Explain(args) => {
            tracing::info!("Running 'explain' process");
            tracing::debug!("Options: {args:?}");
            match service.explain_command(&args.name, &MankierExplainer::new()).await? {
                Explanation::Indexed(commands) => {
                    for command in commands {
                        output::command_details(&command).printstd();
                        println!();
                    }
                }
                Explanation::External(text) => println!("{text}"),
            }
        }
        CliProcess::Config(_) => unreachable!("Handled in main"),
    }
    Ok(())
}

fn show_config(config_file: Option<PathBuf>) -> Result<()> {
    let path = match config_file {
        Some(path) => path,
        None => Config::default_path()?,
    };
    println!("Config file: {}", path.display());
    if path.exists() {
        println!("{}", fs::read_to_string(&path)?);
    } else {
        println!("The file does not exist yet, default values are in use");
    }
    Ok(())
}
