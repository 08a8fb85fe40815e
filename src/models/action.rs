use crate::errors::DispatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Closed set of deferred operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    MedicationLog,
    TimelineEntry,
    ShiftCheckin,
    ShiftCheckout,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::MedicationLog,
        ActionKind::TimelineEntry,
        ActionKind::ShiftCheckin,
        ActionKind::ShiftCheckout,
    ];

    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ActionKind::MedicationLog => "medication_log",
            ActionKind::TimelineEntry => "timeline_entry",
            ActionKind::ShiftCheckin => "shift_checkin",
            ActionKind::ShiftCheckout => "shift_checkout",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "medication_log" => Some(ActionKind::MedicationLog),
            "timeline_entry" => Some(ActionKind::TimelineEntry),
            "shift_checkin" => Some(ActionKind::ShiftCheckin),
            "shift_checkout" => Some(ActionKind::ShiftCheckout),
            _ => None,
        }
    }

    /// Read queries that go stale once an action of this kind reaches the server.
    pub fn affected_queries(&self) -> &'static [QueryKey] {
        match self {
            ActionKind::MedicationLog => &[QueryKey::Medications, QueryKey::Timeline],
            ActionKind::TimelineEntry => &[QueryKey::Timeline],
            ActionKind::ShiftCheckin | ActionKind::ShiftCheckout => &[QueryKey::Shifts],
        }
    }
}

/// Read-side cache groups owned by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    Medications,
    Timeline,
    Shifts,
}

impl QueryKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKey::Medications => "medications",
            QueryKey::Timeline => "timeline",
            QueryKey::Shifts => "shifts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MedicationStatus {
    Taken,
    Skipped,
    Missed,
    Refused,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationLogBody {
    pub status: MedicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationLog {
    pub medication_id: String,
    pub body: MedicationLogBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntryBody {
    #[serde(rename = "type")]
    pub entry_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub care_recipient_id: String,
    pub body: TimelineEntryBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftEventBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload shared by check-in and check-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftEvent {
    pub shift_id: String,
    pub body: ShiftEventBody,
}

/// A caregiver action that can be deferred while offline.
///
/// Enqueue sites build one of these; the store persists it as a
/// `(type, payload)` pair and [`PendingAction::decode`] turns the row back
/// into the same variant at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    MedicationLog(MedicationLog),
    TimelineEntry(TimelineEntry),
    ShiftCheckin(ShiftEvent),
    ShiftCheckout(ShiftEvent),
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::MedicationLog(_) => ActionKind::MedicationLog,
            ActionRequest::TimelineEntry(_) => ActionKind::TimelineEntry,
            ActionRequest::ShiftCheckin(_) => ActionKind::ShiftCheckin,
            ActionRequest::ShiftCheckout(_) => ActionKind::ShiftCheckout,
        }
    }

    /// Server-side id of the resource the action targets.
    pub fn target_id(&self) -> &str {
        match self {
            ActionRequest::MedicationLog(p) => &p.medication_id,
            ActionRequest::TimelineEntry(p) => &p.care_recipient_id,
            ActionRequest::ShiftCheckin(p) | ActionRequest::ShiftCheckout(p) => &p.shift_id,
        }
    }

    /// JSON stored in `pending_actions.payload`.
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            ActionRequest::MedicationLog(p) => serde_json::to_string(p),
            ActionRequest::TimelineEntry(p) => serde_json::to_string(p),
            ActionRequest::ShiftCheckin(p) | ActionRequest::ShiftCheckout(p) => {
                serde_json::to_string(p)
            }
        }
    }
}

/// One row of the `pending_actions` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingAction {
    pub id: i64,                   // ⇔ pending_actions.id (AUTOINCREMENT, FIFO key)
    pub action_type: String,       // ⇔ pending_actions.action_type
    pub payload: String,           // ⇔ pending_actions.payload (JSON)
    pub retry_count: u32,          // ⇔ pending_actions.retry_count
    pub created_at: DateTime<Utc>, // ⇔ pending_actions.created_at (RFC 3339)
}

impl PendingAction {
    pub fn kind(&self) -> Option<ActionKind> {
        ActionKind::from_db_str(&self.action_type)
    }

    /// Rebuild the typed request from the stored row.
    pub fn decode(&self) -> Result<ActionRequest, DispatchError> {
        let kind = self
            .kind()
            .ok_or_else(|| DispatchError::UnknownActionType(self.action_type.clone()))?;

        let invalid = |e: serde_json::Error| DispatchError::InvalidPayload {
            action_type: self.action_type.clone(),
            reason: e.to_string(),
        };

        let request = match kind {
            ActionKind::MedicationLog => {
                ActionRequest::MedicationLog(serde_json::from_str(&self.payload).map_err(invalid)?)
            }
            ActionKind::TimelineEntry => {
                ActionRequest::TimelineEntry(serde_json::from_str(&self.payload).map_err(invalid)?)
            }
            ActionKind::ShiftCheckin => {
                ActionRequest::ShiftCheckin(serde_json::from_str(&self.payload).map_err(invalid)?)
            }
            ActionKind::ShiftCheckout => {
                ActionRequest::ShiftCheckout(serde_json::from_str(&self.payload).map_err(invalid)?)
            }
        };

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(action_type: &str, payload: &str) -> PendingAction {
        PendingAction {
            id: 1,
            action_type: action_type.to_string(),
            payload: payload.to_string(),
            retry_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn medication_body_uses_api_field_names() {
        let mut extra = Map::new();
        extra.insert("dose".to_string(), json!("5mg"));
        let req = ActionRequest::MedicationLog(MedicationLog {
            medication_id: "med-1".into(),
            body: MedicationLogBody {
                status: MedicationStatus::Taken,
                scheduled_time: None,
                notes: Some("with food".into()),
                extra,
            },
        });

        let v: Value = serde_json::from_str(&req.payload_json().unwrap()).unwrap();
        assert_eq!(v["medicationId"], "med-1");
        assert_eq!(v["body"]["status"], "taken");
        assert_eq!(v["body"]["notes"], "with food");
        assert_eq!(v["body"]["dose"], "5mg");
        assert!(v["body"].get("scheduledTime").is_none());
    }

    #[test]
    fn decode_restores_the_same_variant() {
        let req = ActionRequest::ShiftCheckout(ShiftEvent {
            shift_id: "shift-9".into(),
            body: ShiftEventBody {
                notes: Some("handover done".into()),
                ..Default::default()
            },
        });
        let stored = row("shift_checkout", &req.payload_json().unwrap());
        assert_eq!(stored.decode().unwrap(), req);
    }

    #[test]
    fn unknown_type_is_a_programming_error() {
        let err = row("grocery_run", "{}").decode().unwrap_err();
        assert!(matches!(err, DispatchError::UnknownActionType(ref t) if t == "grocery_run"));
        assert!(err.is_programming_error());
    }

    #[test]
    fn payload_drift_is_a_programming_error() {
        let err = row("timeline_entry", r#"{"shiftId":"x"}"#).decode().unwrap_err();
        assert!(matches!(err, DispatchError::InvalidPayload { .. }));
        assert!(err.is_programming_error());
    }

    #[test]
    fn db_strings_cover_every_kind() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_db_str(kind.to_db_str()), Some(kind));
        }
    }
}
