use clap::{Parser, Subcommand, ValueEnum};
use sitter_core::config::ConfigOverrides;
use sitter_core::model::{DaySet, Frequency};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tanksitter", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage tanks
    Tank {
        #[command(subcommand)]
        tank: TankCommand,
    },
    /// Manage a tank's care tasks
    Task {
        #[command(subcommand)]
        task: TaskCommand,
    },
    /// Show the sitter checklist for a share token
    ///
    /// Example: tanksitter checklist 5b0c... --date 2025-12-22
    Checklist {
        share_token: String,
        /// Local date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Check or uncheck a task on the sitter checklist
    ///
    /// Example: tanksitter toggle 5b0c... task-1
    Toggle {
        share_token: String,
        task_id: String,
        /// Local date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TankCommand {
    /// Create a tank and print its share token
    ///
    /// Example: tanksitter tank add "Living room reef"
    Add { name: String },
    /// Delete a tank and all of its tasks
    ///
    /// Example: tanksitter tank delete 1f3a...
    Delete { id: String },
    /// List tanks, newest first
    List,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a task to a tank
    ///
    /// Example: tanksitter task add --tank 1f3a... "Feed" --frequency weekly --days 1,3
    Add {
        #[arg(long)]
        tank: String,
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_enum, default_value_t = FrequencyArg::Daily)]
        frequency: FrequencyArg,
        /// Weekday numbers for weekly tasks, 0 = Sunday
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        days: Vec<i64>,
    },
    /// Delete a task
    ///
    /// Example: tanksitter task delete task-1
    Delete { id: String },
    /// List every task of a tank
    ///
    /// Example: tanksitter task list --tank 1f3a...
    List {
        #[arg(long)]
        tank: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyArg {
    Daily,
    Weekly,
    Once,
}

/// Combine `--frequency` and `--days` into a task frequency.
pub fn build_frequency(frequency: FrequencyArg, days: &[i64]) -> Result<Frequency, String> {
    match frequency {
        FrequencyArg::Weekly => Ok(Frequency::Weekly {
            days: DaySet::from_indices(days.iter().copied()),
        }),
        FrequencyArg::Daily | FrequencyArg::Once if !days.is_empty() => {
            Err("--days only applies to weekly tasks".to_string())
        }
        FrequencyArg::Daily => Ok(Frequency::Daily),
        FrequencyArg::Once => Ok(Frequency::Once),
    }
}

/// Flag name used to identify config override arguments by the runtime.
pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    DataPath,
    CompletionPath,
    UtcOffset,
    LogFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field = canonicalize_flag_name(key_raw)
        .ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "data_path" | "data" => ConfigOverrideTarget::DataPath,
        "completion_path" | "completion" => ConfigOverrideTarget::CompletionPath,
        "utc_offset" | "offset" => ConfigOverrideTarget::UtcOffset,
        "log_filter" | "log" => ConfigOverrideTarget::LogFilter,
        other => return Err(format!("unknown config field '{other}'")),
    };

    if value.is_empty() {
        return Err(format!("override for '{canonical_field}' needs a value"));
    }

    Ok(ParsedConfigOverride { target, value })
}

/// Fold every `--config-override` argument into one set of overrides.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::DataPath => {
                overrides.data_path = Some(PathBuf::from(parsed.value));
            }
            ConfigOverrideTarget::CompletionPath => {
                overrides.completion_path = Some(PathBuf::from(parsed.value));
            }
            ConfigOverrideTarget::UtcOffset => overrides.utc_offset = Some(parsed.value),
            ConfigOverrideTarget::LogFilter => overrides.log_filter = Some(parsed.value),
        }
    }
    Ok(overrides)
}

/// Pull `--config-override` values out of raw process arguments, before
/// clap runs, so config can shape logging for the parse itself.
pub fn scan_config_overrides<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut found = Vec::new();
    let mut take_next = false;
    for arg in args {
        let arg = arg.as_ref();
        if take_next {
            found.push(arg.to_string());
            take_next = false;
        } else if arg == CONFIG_OVERRIDE_FLAG {
            take_next = true;
        } else if let Some(value) = arg
            .strip_prefix(CONFIG_OVERRIDE_FLAG)
            .and_then(|rest| rest.strip_prefix('='))
        {
            found.push(value.to_string());
        }
    }
    found
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
