use crate::error::AppError;
use serde::{Deserialize, Deserializer, Serialize};
use time::Weekday;

/// Weekday indices a weekly task runs on, 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DaySet(u8);

impl DaySet {
    pub const EMPTY: DaySet = DaySet(0);

    /// Indices outside 0..=6 are dropped; they could never match a date.
    pub fn from_indices<I: IntoIterator<Item = i64>>(indices: I) -> Self {
        let mut set = Self::EMPTY;
        for index in indices {
            if (0..=6).contains(&index) {
                set.0 |= 1u8 << index;
            }
        }
        set
    }

    pub fn from_weekdays<I: IntoIterator<Item = Weekday>>(weekdays: I) -> Self {
        let mut set = Self::EMPTY;
        for weekday in weekdays {
            set.insert(weekday);
        }
        set
    }

    pub fn insert(&mut self, weekday: Weekday) {
        self.0 |= 1u8 << weekday.number_days_from_sunday();
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1u8 << weekday.number_days_from_sunday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn indices(&self) -> Vec<u8> {
        (0..7u8).filter(|index| self.0 & (1u8 << index) != 0).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly { days: DaySet },
    Once,
}

impl Frequency {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly { .. } => "weekly",
            Self::Once => "once",
        }
    }

    pub fn from_parts(frequency_type: &str, days: Option<&[i64]>) -> Result<Self, AppError> {
        match frequency_type {
            "daily" => Ok(Self::Daily),
            "once" => Ok(Self::Once),
            "weekly" => Ok(Self::Weekly {
                days: DaySet::from_indices(days.unwrap_or_default().iter().copied()),
            }),
            other => Err(AppError::invalid_data(format!(
                "unknown frequency_type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub tank_id: String,
    pub title: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub created_at: String,
}

/// Stored and wire shape of a task, with the frequency kept loosely typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub tank_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub frequency_type: String,
    #[serde(default, deserialize_with = "lenient_days")]
    pub frequency_days: Option<Vec<i64>>,
    pub created_at: String,
}

/// Entries that are not integers are dropped, as is a value that is not a
/// list; none of them can name a weekday.
fn lenient_days<'de, D>(deserializer: D) -> Result<Option<Vec<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(serde_json::Value::as_i64)
                .collect(),
        ),
        Some(_) => Some(Vec::new()),
    })
}

impl TryFrom<TaskRecord> for Task {
    type Error = AppError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let frequency =
            Frequency::from_parts(&record.frequency_type, record.frequency_days.as_deref())?;
        Ok(Task {
            id: record.id,
            tank_id: record.tank_id,
            title: record.title,
            description: record.description,
            frequency,
            created_at: record.created_at,
        })
    }
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        let frequency_days = match &task.frequency {
            Frequency::Weekly { days } => {
                Some(days.indices().into_iter().map(i64::from).collect())
            }
            Frequency::Daily | Frequency::Once => None,
        };
        TaskRecord {
            id: task.id.clone(),
            tank_id: task.tank_id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            frequency_type: task.frequency.label().to_string(),
            frequency_days,
            created_at: task.created_at.clone(),
        }
    }
}
