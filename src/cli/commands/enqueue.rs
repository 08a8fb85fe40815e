use crate::cli::parser::EnqueueAction;
use crate::config::Config;
use crate::core::engine::SyncEngine;
use crate::errors::{AppError, AppResult};
use crate::models::action::{
    ActionRequest, MedicationLog, MedicationLogBody, ShiftEvent, ShiftEventBody, TimelineEntry,
    TimelineEntryBody,
};
use crate::ui::messages;
use chrono::{DateTime, Utc};
use serde_json::Map;

/// Build the typed action from the command-line flags.
pub fn build_request(action: &EnqueueAction) -> AppResult<ActionRequest> {
    let request = match action {
        EnqueueAction::MedicationLog {
            medication_id,
            status,
            scheduled,
            notes,
        } => {
            let scheduled_time = scheduled
                .as_deref()
                .map(|s| {
                    DateTime::parse_from_rfc3339(s)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|_| {
                            AppError::InvalidInput(format!(
                                "'{s}' is not an RFC 3339 timestamp"
                            ))
                        })
                })
                .transpose()?;
            ActionRequest::MedicationLog(MedicationLog {
                medication_id: non_empty("medication id", medication_id)?,
                body: MedicationLogBody {
                    status: *status,
                    scheduled_time,
                    notes: notes.clone(),
                    extra: Map::new(),
                },
            })
        }
        EnqueueAction::TimelineEntry {
            care_recipient_id,
            entry_type,
            title,
            description,
        } => ActionRequest::TimelineEntry(TimelineEntry {
            care_recipient_id: non_empty("care recipient id", care_recipient_id)?,
            body: TimelineEntryBody {
                entry_type: non_empty("entry type", entry_type)?,
                title: non_empty("title", title)?,
                description: description.clone(),
                extra: Map::new(),
            },
        }),
        EnqueueAction::ShiftCheckin {
            shift_id,
            notes,
            location,
        } => ActionRequest::ShiftCheckin(shift_event(shift_id, notes, location)?),
        EnqueueAction::ShiftCheckout {
            shift_id,
            notes,
            location,
        } => ActionRequest::ShiftCheckout(shift_event(shift_id, notes, location)?),
    };
    Ok(request)
}

fn shift_event(
    shift_id: &str,
    notes: &Option<String>,
    location: &Option<String>,
) -> AppResult<ShiftEvent> {
    Ok(ShiftEvent {
        shift_id: non_empty("shift id", shift_id)?,
        body: ShiftEventBody {
            notes: notes.clone(),
            location: location.clone(),
            extra: Map::new(),
        },
    })
}

fn non_empty(what: &str, value: &str) -> AppResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(v.to_string())
}

pub async fn handle(action: &EnqueueAction, cfg: &Config, offline: bool) -> AppResult<()> {
    let request = build_request(action)?;
    let engine = SyncEngine::from_config(cfg, offline)?;

    let stored = engine.store.enqueue(&request)?;
    messages::success(format!(
        "Queued {} #{} for {}",
        stored.action_type,
        stored.id,
        request.target_id()
    ));

    if !engine.probe().await {
        messages::offline_notice();
        return Ok(());
    }

    if cfg.sync_on_enqueue
        && let Err(e) = engine.orchestrator.sync_now().await
    {
        // The action is stored; a failed drain must not look like a failed enqueue.
        messages::warning(format!(
            "#{} is queued but the sync did not complete: {}",
            stored.id, e
        ));
    }
    Ok(())
}
