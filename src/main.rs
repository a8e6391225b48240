use clap::Parser;
use stepwise::cli::commands::Cli;
use stepwise::cli::handlers;
use stepwise::logging;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // The TUI owns the terminal, so it only logs to a file
    match &cli.log_file {
        Some(path) => logging::init_file(path)?,
        None if cli.command.is_some() => logging::init_stderr(),
        None => {}
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        None => {
            // No subcommand → launch TUI
            let settings = handlers::load_settings(cli.config.as_deref(), cli.url.as_deref())?;
            tracing::info!(base_url = %settings.config.service.base_url, "starting tui");
            let controller = handlers::controller(&settings)?;
            stepwise::tui::run(controller, runtime.handle().clone())
        }
        Some(_) => handlers::dispatch(cli, &runtime),
    }
}
