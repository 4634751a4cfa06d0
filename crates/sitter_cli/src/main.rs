use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use sitter_cli::cli::{
    self, Cli, Command, TankCommand, TaskCommand, build_frequency, collect_config_overrides,
};
use sitter_core::checklist::{Checklist, SitterSession};
use sitter_core::clock::{SystemClock, format_iso_date, parse_iso_date};
use sitter_core::config::{self, Config, StorePaths};
use sitter_core::error::AppError;
use sitter_core::model::{Frequency, Tank, Task, TaskRecord};
use sitter_core::sitter_api::{self, NewTask, ToggleOutcome};
use sitter_core::source::JsonTaskSource;
use sitter_core::storage::FileKeyValueStore;
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::Date;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

struct Runtime {
    paths: StorePaths,
    source: JsonTaskSource,
    session: SitterSession<FileKeyValueStore, SystemClock>,
}

#[derive(Tabled)]
struct TankRow {
    id: String,
    name: String,
    share_token: String,
}

#[derive(Tabled)]
struct TaskRow {
    id: String,
    title: String,
    frequency: String,
    created_at: String,
}

#[derive(Tabled)]
struct ChecklistRow {
    #[tabled(rename = "done")]
    mark: &'static str,
    id: String,
    title: String,
    frequency: String,
    description: String,
}

fn init_tracing(config: &Config) {
    let fallback = config.log_filter.as_deref().unwrap_or("warn");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .try_init()
        .ok();
}

fn build_runtime(raw_args: &[String]) -> Result<Runtime, AppError> {
    let loaded = config::load_config_with_fallback();
    let overrides = collect_config_overrides(&cli::scan_config_overrides(raw_args))
        .map_err(AppError::invalid_input)?;
    let config = config::merge_overrides(&loaded.config, &overrides);

    init_tracing(&config);
    if let Some(err) = loaded.error {
        warn!(error = %err, "using default configuration");
    }

    let paths = StorePaths::resolve(&config)?;
    let clock = config.clock()?;
    Ok(Runtime {
        source: sitter_api::task_source(&paths),
        session: sitter_api::open_session(&paths, clock),
        paths,
    })
}

fn frequency_text(frequency: &Frequency) -> String {
    match frequency {
        Frequency::Weekly { days } if days.is_empty() => "weekly (no days)".to_string(),
        Frequency::Weekly { days } => {
            let names: Vec<&str> = days
                .indices()
                .into_iter()
                .map(|index| WEEKDAY_NAMES[usize::from(index)])
                .collect();
            format!("weekly ({})", names.join(", "))
        }
        other => other.label().to_string(),
    }
}

fn task_json(task: &Task) -> serde_json::Value {
    let record = TaskRecord::from(task);
    serde_json::json!({
        "id": record.id,
        "tank_id": record.tank_id,
        "title": record.title,
        "description": record.description,
        "frequency_type": record.frequency_type,
        "frequency_days": record.frequency_days,
        "created_at": record.created_at,
    })
}

fn print_added_tank(tank: &Tank, json: bool) {
    if json {
        println!("{}", serde_json::json!(tank));
    } else {
        println!("Added tank: {} ({})", tank.name, tank.id);
        println!("Share token: {}", tank.share_token);
    }
}

fn print_tanks(tanks: &[Tank], json: bool) {
    if json {
        println!("{}", serde_json::json!(tanks));
        return;
    }

    if tanks.is_empty() {
        println!("No tanks yet.");
        return;
    }

    let rows = tanks.iter().map(|tank| TankRow {
        id: tank.id.clone(),
        name: tank.name.clone(),
        share_token: tank.share_token.clone(),
    });
    println!("{}", Table::new(rows).with(Style::psql()));
}

fn print_tasks(tasks: &[Task], json: bool) {
    if json {
        let payload: Vec<serde_json::Value> = tasks.iter().map(task_json).collect();
        println!("{}", serde_json::Value::Array(payload));
        return;
    }

    if tasks.is_empty() {
        println!("No tasks for this tank.");
        return;
    }

    let rows = tasks.iter().map(|task| TaskRow {
        id: task.id.clone(),
        title: task.title.clone(),
        frequency: frequency_text(&task.frequency),
        created_at: task.created_at.clone(),
    });
    println!("{}", Table::new(rows).with(Style::psql()));
}

fn checklist_json(checklist: &Checklist) -> serde_json::Value {
    let tasks: Vec<serde_json::Value> = checklist
        .items
        .iter()
        .map(|item| {
            let mut value = task_json(&item.task);
            value["done"] = serde_json::Value::Bool(item.done);
            value
        })
        .collect();

    serde_json::json!({
        "tank": {
            "id": checklist.tank.id,
            "name": checklist.tank.name,
        },
        "date": format_iso_date(checklist.date),
        "all_done": checklist.all_done(),
        "done_count": checklist.done_count(),
        "due_count": checklist.due_count(),
        "progress_percent": checklist.progress_percent(),
        "tasks": tasks,
    })
}

fn progress_line(checklist: &Checklist) -> String {
    format!(
        "Progress: {}/{} ({}%)",
        checklist.done_count(),
        checklist.due_count(),
        checklist.progress_percent()
    )
}

fn print_checklist(checklist: &Checklist, json: bool) {
    if json {
        println!("{}", checklist_json(checklist));
        return;
    }

    println!(
        "{} - {}",
        checklist.tank.name,
        format_iso_date(checklist.date)
    );

    if checklist.items.is_empty() {
        println!("No tasks due today.");
    } else {
        let rows = checklist.items.iter().map(|item| ChecklistRow {
            mark: if item.done { "[x]" } else { "[ ]" },
            id: item.task.id.clone(),
            title: item.task.title.clone(),
            frequency: frequency_text(&item.task.frequency),
            description: item.task.description.clone().unwrap_or_default(),
        });
        println!("{}", Table::new(rows).with(Style::psql()));
    }

    println!("{}", progress_line(checklist));
    if checklist.all_done() {
        println!("All done for today!");
    }
}

fn print_toggle(outcome: &ToggleOutcome, json: bool) {
    if json {
        let json = serde_json::json!({
            "task_id": outcome.task_id,
            "done": outcome.done,
            "all_done": outcome.checklist.all_done(),
            "done_count": outcome.checklist.done_count(),
            "due_count": outcome.checklist.due_count(),
        });
        println!("{}", json);
        return;
    }

    let verb = if outcome.done { "Checked" } else { "Unchecked" };
    println!("{verb} task: {}", outcome.task_id);
    println!("{}", progress_line(&outcome.checklist));
    if outcome.checklist.all_done() {
        println!("All done for today!");
    }
}

fn resolve_date(runtime: &Runtime, date: Option<&str>) -> Result<Date, AppError> {
    match date {
        Some(raw) => parse_iso_date(raw),
        None => Ok(runtime.session.today()),
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_command(runtime: &mut Runtime, cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Tank { tank } => match tank {
            TankCommand::Add { name } => {
                let tank = sitter_api::add_tank(&runtime.paths, &name)?;
                print_added_tank(&tank, cli.json);
            }
            TankCommand::Delete { id } => {
                let tank = sitter_api::delete_tank(&runtime.paths, &id)?;
                if cli.json {
                    println!("{}", serde_json::json!(tank));
                } else {
                    println!("Deleted tank: {} ({})", tank.name, tank.id);
                }
            }
            TankCommand::List => {
                let tanks = sitter_api::list_tanks(&runtime.paths)?;
                print_tanks(&tanks, cli.json);
            }
        },
        Command::Task { task } => match task {
            TaskCommand::Add {
                tank,
                title,
                description,
                frequency,
                days,
            } => {
                let frequency =
                    build_frequency(frequency, &days).map_err(AppError::invalid_input)?;
                let new_task = NewTask {
                    title,
                    description,
                    frequency,
                };
                let task = sitter_api::add_task(&runtime.paths, &tank, new_task)?;
                if cli.json {
                    println!("{}", task_json(&task));
                } else {
                    println!(
                        "Added task: {} ({}) {}",
                        task.title,
                        task.id,
                        frequency_text(&task.frequency)
                    );
                }
            }
            TaskCommand::Delete { id } => {
                let record = sitter_api::delete_task(&runtime.paths, &id)?;
                if cli.json {
                    println!("{}", serde_json::json!(record));
                } else {
                    println!("Deleted task: {} ({})", record.title, record.id);
                }
            }
            TaskCommand::List { tank } => {
                let tasks = sitter_api::list_tasks(&runtime.paths, &tank)?;
                print_tasks(&tasks, cli.json);
            }
        },
        Command::Checklist { share_token, date } => {
            let date = resolve_date(runtime, date.as_deref())?;
            let checklist = runtime
                .session
                .checklist_on(&runtime.source, &share_token, date)?;
            print_checklist(&checklist, cli.json);
        }
        Command::Toggle {
            share_token,
            task_id,
            date,
        } => {
            let date = resolve_date(runtime, date.as_deref())?;
            let outcome = sitter_api::toggle_task(
                &mut runtime.session,
                &runtime.source,
                &share_token,
                &task_id,
                date,
            )?;
            print_toggle(&outcome, cli.json);
        }
    }

    Ok(())
}

fn run_interactive(runtime: &mut Runtime) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock.read_line(&mut input)?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("tanksitter".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if !cli.config_override.is_empty() {
            warn!("config overrides only apply at startup");
        }

        if let Err(err) = run_command(runtime, cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    let raw_args: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    if raw_args.len() <= 1 {
        let result = build_runtime(&raw_args).and_then(|mut runtime| run_interactive(&mut runtime));
        if let Err(err) = result {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse_from(&raw_args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let result = build_runtime(&raw_args).and_then(|mut runtime| run_command(&mut runtime, cli));
    if let Err(err) = result {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
