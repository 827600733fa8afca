// Due dates: countdown state per note, upcoming deadlines and daily reports

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::common::{plain_text, prefix_chars};
use super::Engine;
use crate::error::Result;
use crate::models::Note;
use crate::session::SecuritySession;
use crate::storage::{keys, load_setting_as, save_setting_as};

const UPCOMING_WINDOW_MINUTES: i64 = 60;
const EARLY_PERCENT: f64 = 51.0;
const URGENT_PERCENT: f64 = 76.0;
const REMINDER_TEXT_CHARS: usize = 100;

/// Parse a stored due date: RFC 3339, or a local `YYYY-MM-DDTHH:MM[:SS]` value
pub fn parse_due(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DueAlert {
    Normal,
    /// Past half of the time between creation and deadline
    Early,
    /// Past three quarters of it
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    NoDeadline,
    Completed,
    Overdue,
    Pending { remaining: Duration, alert: DueAlert },
}

impl DueState {
    /// Short countdown label: days, else hours, else minutes
    pub fn label(&self) -> String {
        match self {
            Self::NoDeadline => String::new(),
            Self::Completed => "Completed".to_string(),
            Self::Overdue => "Overdue".to_string(),
            Self::Pending { remaining, .. } => {
                let (days, hours) = (remaining.num_days(), remaining.num_hours());
                if days > 0 {
                    format!("{} day{} left", days, if days > 1 { "s" } else { "" })
                } else if hours > 0 {
                    format!("{} hour{} left", hours, if hours > 1 { "s" } else { "" })
                } else {
                    format!("{} min left", remaining.num_minutes())
                }
            }
        }
    }
}

pub fn due_state(note: &Note, now: DateTime<Utc>) -> DueState {
    let Some(due) = note.due_date.as_deref().and_then(parse_due) else {
        return DueState::NoDeadline;
    };
    if note.status.is_done() {
        return DueState::Completed;
    }
    let remaining = due - now;
    if remaining < Duration::zero() {
        return DueState::Overdue;
    }

    let alert = match DateTime::parse_from_rfc3339(&note.creation_date) {
        Ok(created) => {
            let total = (due - created.with_timezone(&Utc)).num_milliseconds();
            let elapsed = (now - created.with_timezone(&Utc)).num_milliseconds();
            if total <= 0 {
                DueAlert::Normal
            } else {
                let percent = elapsed as f64 / total as f64 * 100.0;
                if percent >= URGENT_PERCENT {
                    DueAlert::Urgent
                } else if percent >= EARLY_PERCENT {
                    DueAlert::Early
                } else {
                    DueAlert::Normal
                }
            }
        }
        Err(_) => DueAlert::Normal,
    };
    DueState::Pending { remaining, alert }
}

/// A note whose deadline is close or past
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueReminder {
    pub id: String,
    pub text: String,
    pub due: DateTime<Utc>,
    pub is_overdue: bool,
}

fn collect_upcoming(notes: &[Note], security: &SecuritySession, now: DateTime<Utc>, out: &mut Vec<DueReminder>) {
    for note in notes {
        if note.is_archived || security.is_locked(note) {
            continue;
        }
        if let Some(due) = note.due_date.as_deref().and_then(parse_due) {
            let minutes = (due - now).num_minutes();
            if !note.status.is_done() && minutes <= UPCOMING_WINDOW_MINUTES {
                out.push(DueReminder {
                    id: note.id.clone(),
                    text: prefix_chars(&plain_text(&note.content), REMINDER_TEXT_CHARS),
                    due,
                    is_overdue: due < now,
                });
            }
        }
        collect_upcoming(&note.children, security, now, out);
    }
}

/// Times of day at which the reminder summary pops up once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSlot {
    Morning,
    Noon,
    Evening,
}

impl ReportSlot {
    const ALL: [ReportSlot; 3] = [Self::Morning, Self::Noon, Self::Evening];

    fn start_hour(self) -> u32 {
        match self {
            Self::Morning => 7,
            Self::Noon => 12,
            Self::Evening => 18,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Morning => keys::LAST_MORNING_REPORT,
            Self::Noon => keys::LAST_NOON_REPORT,
            Self::Evening => keys::LAST_EVENING_REPORT,
        }
    }

    /// Latest slot that has started at this hour
    pub fn current(hour: u32) -> Option<Self> {
        Self::ALL.into_iter().rev().find(|slot| hour >= slot.start_hour())
    }
}

/// True when some slot that has started today was not reported today.
/// `last` holds the last report date per slot, in `ReportSlot::ALL` order.
pub fn report_due(hour: u32, today: &str, last: &[Option<String>; 3]) -> bool {
    ReportSlot::ALL
        .iter()
        .zip(last)
        .any(|(slot, last)| hour >= slot.start_hour() && last.as_deref() != Some(today))
}

/// Summary shown by the notification center
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueReport {
    pub reminders: Vec<DueReminder>,
    pub has_unseen: bool,
    /// Whether the summary should pop up now
    pub show_popup: bool,
}

impl Engine {
    /// Active, unlocked, unfinished notes due within the next hour or overdue
    pub fn upcoming_due(&self, now: DateTime<Utc>) -> Result<Vec<DueReminder>> {
        self.with_document(|doc| {
            let mut out = Vec::new();
            collect_upcoming(doc.notes(), &self.session.security, now, &mut out);
            out.sort_by_key(|r| r.due);
            out
        })
    }

    pub fn due_state_of(&self, id: &str, now: DateTime<Utc>) -> Option<DueState> {
        self.find_note(id).map(|note| due_state(&note, now))
    }

    /// Build the reminder report and record the report slot when it pops up
    pub async fn check_reminders(&self, now: DateTime<Local>) -> Result<DueReport> {
        let reminders = self.upcoming_due(now.with_timezone(&Utc))?;
        let has_unseen = {
            let prefs = self.session.preferences.read();
            reminders.iter().any(|r| !prefs.seen_notifications.contains(&r.id))
        };

        let today = now.format("%Y-%m-%d").to_string();
        let mut last: [Option<String>; 3] = Default::default();
        for (slot, value) in ReportSlot::ALL.into_iter().zip(last.iter_mut()) {
            *value = load_setting_as::<String>(self.storage.as_ref(), slot.key())
                .await
                .unwrap_or_else(|e| {
                    warn!("[check_reminders] Could not read {}: {}", slot.key(), e);
                    None
                });
        }

        let show_popup = !reminders.is_empty() && report_due(now.hour(), &today, &last);
        if show_popup {
            if let Some(slot) = ReportSlot::current(now.hour()) {
                let saved = save_setting_as(self.storage.as_ref(), slot.key(), &today).await;
                self.report("check_reminders", saved.map_err(Into::into))?;
            }
        }
        debug!(
            "[check_reminders] {} reminders, popup: {}",
            reminders.len(),
            show_popup
        );
        Ok(DueReport {
            reminders,
            has_unseen,
            show_popup,
        })
    }
}
