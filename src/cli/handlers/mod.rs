mod config;
pub use config::{Settings, cmd_config, load_settings};

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::snapshot;
use crate::model::task::TaskId;
use crate::service::{HttpTaskService, TaskService};
use crate::sync::SyncController;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run a subcommand. The TUI (no subcommand) is launched from main.
pub fn dispatch(cli: Cli, runtime: &Runtime) -> CmdResult {
    let json = cli.json;
    let settings = load_settings(cli.config.as_deref(), cli.url.as_deref())?;

    match cli.command {
        None => Err("no subcommand given (run `sw` without arguments for the TUI)".into()),
        Some(cmd) => match cmd {
            // Read commands
            Commands::List(args) => cmd_list(&settings, args, json, runtime),
            Commands::Status => cmd_status(&settings, json, runtime),
            Commands::Notes(args) => cmd_notes(&settings, args, json, runtime),

            // Write commands
            Commands::Add(args) => cmd_add(&settings, args, json, runtime),
            Commands::Title(args) => cmd_title(&settings, args, json, runtime),
            Commands::Done(args) => cmd_set_completed(&settings, args, true, json, runtime),
            Commands::Undone(args) => cmd_set_completed(&settings, args, false, json, runtime),
            Commands::Rm(args) => cmd_rm(&settings, args, runtime),
            Commands::Split(args) => cmd_split(&settings, args, json, runtime),
            Commands::Clear(args) => cmd_clear(&settings, args, runtime),

            // Configuration
            Commands::Config(args) => cmd_config(&settings, args, json),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn service(settings: &Settings) -> Result<Arc<HttpTaskService>, Box<dyn std::error::Error>> {
    Ok(Arc::new(HttpTaskService::new(&settings.config.service)?))
}

/// Build a controller over the HTTP service, writing the snapshot cache
/// when it is enabled.
pub fn controller(
    settings: &Settings,
) -> Result<SyncController<HttpTaskService>, Box<dyn std::error::Error>> {
    let controller = SyncController::new(service(settings)?, &settings.config.editing);
    Ok(match cache_path(settings) {
        Some(path) => controller.with_snapshot(path),
        None => controller,
    })
}

fn cache_path(settings: &Settings) -> Option<PathBuf> {
    let cache = &settings.config.cache;
    cache.enabled.then(|| PathBuf::from(&cache.path))
}

/// Controller with the current tree loaded
fn connect(
    settings: &Settings,
    runtime: &Runtime,
) -> Result<SyncController<HttpTaskService>, Box<dyn std::error::Error>> {
    let mut controller = controller(settings)?;
    runtime.block_on(controller.reload())?;
    Ok(controller)
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn print_subtree(
    controller: &SyncController<HttpTaskService>,
    id: &TaskId,
    json: bool,
) -> CmdResult {
    let Some(node) = controller.tree().subtree(id.as_str()) else {
        return Ok(());
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&node)?);
    } else {
        print_lines(&format_task_tree(&node, 0));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(settings: &Settings, args: ListArgs, json: bool, runtime: &Runtime) -> CmdResult {
    if args.cached {
        let path = PathBuf::from(&settings.config.cache.path);
        let cached = snapshot::read_snapshot(&path)
            .ok_or_else(|| format!("no snapshot at {}", path.display()))?;
        if json {
            println!("{}", serde_json::to_string_pretty(&cached)?);
        } else {
            print_lines(&format_forest(&cached.tasks));
            println!("(cached {})", cached.saved_at.format("%Y-%m-%d %H:%M"));
        }
        return Ok(());
    }

    let controller = connect(settings, runtime)?;
    let forest = controller.tree().to_forest();
    if json {
        println!("{}", serde_json::to_string_pretty(&forest)?);
    } else {
        print_lines(&format_forest(&forest));
        if !forest.is_empty() {
            println!();
            println!("{}", format_totals(&forest));
        }
    }
    Ok(())
}

fn cmd_status(settings: &Settings, json: bool, runtime: &Runtime) -> CmdResult {
    let service = service(settings)?;
    let base_url = service.base_url().to_string();
    let result = runtime.block_on(service.health());

    let report = match &result {
        Ok(health) => StatusJson {
            base_url,
            reachable: true,
            status: Some(health.status.clone()),
            message: health.message.clone(),
        },
        Err(e) => StatusJson {
            base_url,
            reachable: false,
            status: None,
            message: e.to_string(),
        },
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.reachable {
        println!("{}: {} ({})", report.base_url, report.message, report.status.unwrap_or_default());
    }
    result.map(|_| ()).map_err(Into::into)
}

fn cmd_notes(settings: &Settings, args: IdArg, json: bool, runtime: &Runtime) -> CmdResult {
    let mut controller = controller(settings)?;
    let doc = runtime.block_on(controller.generate_notes(&TaskId::new(args.id)))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print_lines(&format_notes(&doc));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(settings: &Settings, args: AddArgs, json: bool, runtime: &Runtime) -> CmdResult {
    let mut controller = connect(settings, runtime)?;
    let parent = args.parent.map(TaskId::new);
    let created = runtime.block_on(controller.create_task(&args.title, parent.as_ref()))?;
    match created {
        Some(id) => print_subtree(&controller, &id, json),
        None => {
            println!("added");
            Ok(())
        }
    }
}

fn cmd_title(settings: &Settings, args: TitleArgs, json: bool, runtime: &Runtime) -> CmdResult {
    let mut controller = connect(settings, runtime)?;
    let id = TaskId::new(args.id);
    if !controller.tree().contains(id.as_str()) {
        return Err(format!("task not found: {}", id).into());
    }
    runtime.block_on(controller.rename(&id, &args.title))?;
    print_subtree(&controller, &id, json)
}

fn cmd_set_completed(
    settings: &Settings,
    args: IdArg,
    value: bool,
    json: bool,
    runtime: &Runtime,
) -> CmdResult {
    let mut controller = connect(settings, runtime)?;
    let id = TaskId::new(args.id);
    runtime.block_on(controller.set_completed(&id, value))?;
    print_subtree(&controller, &id, json)
}

fn cmd_rm(settings: &Settings, args: IdArg, runtime: &Runtime) -> CmdResult {
    let mut controller = controller(settings)?;
    let id = TaskId::new(args.id);
    runtime.block_on(controller.delete_task(&id))?;
    println!("deleted {}", id);
    Ok(())
}

fn cmd_split(settings: &Settings, args: SplitArgs, json: bool, runtime: &Runtime) -> CmdResult {
    let mut controller = connect(settings, runtime)?;
    let id = TaskId::new(args.id);
    let response = runtime.block_on(controller.split_task(&id, args.context.as_deref()))?;
    if json {
        let tasks = controller
            .tree()
            .subtree(id.as_str())
            .map(|n| n.children)
            .unwrap_or_default();
        let out = SplitJson {
            task_id: id.as_str(),
            subtasks: &response.subtasks,
            reasoning: response.reasoning.as_deref(),
            tasks,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_lines(&format_split(&response));
    }
    Ok(())
}

fn cmd_clear(settings: &Settings, args: ClearArgs, runtime: &Runtime) -> CmdResult {
    if !args.yes {
        return Err("refusing to delete every task without --yes".into());
    }
    let mut controller = controller(settings)?;
    runtime.block_on(controller.clear_all())?;
    println!("cleared");
    Ok(())
}
