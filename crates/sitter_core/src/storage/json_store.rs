use crate::error::AppError;
use crate::model::{Tank, TaskRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredData {
    schema_version: u32,
    #[serde(default)]
    tanks: Vec<Tank>,
    #[serde(default)]
    tasks: Vec<TaskRecord>,
}

/// Everything the owner side keeps: tanks and their task records.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SitterState {
    pub tanks: Vec<Tank>,
    pub tasks: Vec<TaskRecord>,
}

pub fn load_state(path: &Path) -> Result<SitterState, AppError> {
    if !path.exists() {
        return Ok(SitterState::default());
    }

    let content = std::fs::read_to_string(path)?;
    let stored: StoredData =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    let tank_ids: HashSet<&str> = stored.tanks.iter().map(|tank| tank.id.as_str()).collect();
    if let Some(orphan) = stored
        .tasks
        .iter()
        .find(|task| !tank_ids.contains(task.tank_id.as_str()))
    {
        return Err(AppError::invalid_data(format!(
            "task {} references unknown tank {}",
            orphan.id, orphan.tank_id
        )));
    }

    Ok(SitterState {
        tanks: stored.tanks,
        tasks: stored.tasks,
    })
}

pub fn save_state(path: &Path, state: &SitterState) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let stored = StoredData {
        schema_version: SCHEMA_VERSION,
        tanks: state.tanks.clone(),
        tasks: state.tasks.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)?;
    }

    Ok(())
}
