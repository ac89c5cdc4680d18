//! Argument parsing and result payloads for the in-call functions.

use serde_json::{json, Map, Value};

pub const TRANSFER_CALL: &str = "transfer_call";
pub const SCHEDULE_APPOINTMENT: &str = "schedule_appointment";

/// Function-call arguments that could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid arguments: {0}")]
    Json(#[from] serde_json::Error),
    #[error("arguments must be a JSON object")]
    NotAnObject,
    #[error("field '{0}' must be a string")]
    NotAString(&'static str),
}

// ── transfer_call ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransferArgs {
    pub target_agent: Option<String>,
    pub reason: String,
    pub caller_name: Option<String>,
}

pub fn parse_transfer(arguments: &str) -> Result<TransferArgs, ValidationError> {
    let obj = parse_object(arguments)?;
    Ok(TransferArgs {
        target_agent: opt_string(&obj, "target_agent")?.filter(|s| !s.trim().is_empty()),
        reason: opt_string(&obj, "reason")?.unwrap_or_default(),
        caller_name: opt_string(&obj, "caller_name")?,
    })
}

pub fn transferred_payload(target_agent: &str) -> Value {
    json!({
        "status": "transferred",
        "target_agent": target_agent,
        "message": format!("Transferring to {target_agent}"),
    })
}

// ── schedule_appointment ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppointmentRequest {
    pub name: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub reason: String,
}

/// Never fails: unreadable arguments yield an all-empty request.
pub fn parse_appointment(arguments: &str) -> AppointmentRequest {
    let obj = match parse_object(arguments) {
        Ok(o) => o,
        Err(e) => {
            tracing::debug!(error = %e, "appointment arguments unreadable, using empty fields");
            Map::new()
        }
    };
    AppointmentRequest {
        name: lenient_string(&obj, "name"),
        phone: lenient_string(&obj, "phone"),
        date: lenient_string(&obj, "date"),
        time: lenient_string(&obj, "time"),
        reason: lenient_string(&obj, "reason"),
    }
}

pub fn scheduled_payload(appt: &AppointmentRequest) -> Value {
    json!({
        "status": "scheduled",
        "appointment": {
            "name": appt.name,
            "phone": appt.phone,
            "date": appt.date,
            "time": appt.time,
            "reason": appt.reason,
        },
        "confirmation": format!(
            "Appointment scheduled for {} on {} at {}",
            appt.name, appt.date, appt.time
        ),
    })
}

// ── shared ─────────────────────────────────────────────────────────

pub fn error_payload(message: impl std::fmt::Display) -> Value {
    json!({ "status": "error", "message": message.to_string() })
}

fn parse_object(arguments: &str) -> Result<Map<String, Value>, ValidationError> {
    match serde_json::from_str::<Value>(arguments)? {
        Value::Object(map) => Ok(map),
        _ => Err(ValidationError::NotAnObject),
    }
}

fn opt_string(
    obj: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::NotAString(key)),
    }
}

fn lenient_string(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_args_parse() {
        let args =
            parse_transfer(r#"{"target_agent":"dentist","reason":"toothache","caller_name":"Sam"}"#)
                .unwrap();
        assert_eq!(args.target_agent.as_deref(), Some("dentist"));
        assert_eq!(args.reason, "toothache");
        assert_eq!(args.caller_name.as_deref(), Some("Sam"));
    }

    #[test]
    fn transfer_target_is_optional() {
        let args = parse_transfer(r#"{"reason":"unsure","target_agent":""}"#).unwrap();
        assert!(args.target_agent.is_none());
    }

    #[test]
    fn malformed_transfer_args_are_rejected() {
        assert!(matches!(parse_transfer("{oops"), Err(ValidationError::Json(_))));
        assert!(matches!(parse_transfer("[1,2]"), Err(ValidationError::NotAnObject)));
        assert!(matches!(
            parse_transfer(r#"{"target_agent": 7}"#),
            Err(ValidationError::NotAString("target_agent"))
        ));
    }

    #[test]
    fn appointment_is_permissive() {
        assert_eq!(parse_appointment(""), AppointmentRequest::default());
        assert_eq!(parse_appointment("{}"), AppointmentRequest::default());

        let appt = parse_appointment(r#"{"name":"Ana","date":"2026-03-01","time":10}"#);
        assert_eq!(appt.name, "Ana");
        assert_eq!(appt.date, "2026-03-01");
        assert_eq!(appt.time, "10");
        assert_eq!(appt.phone, "");
    }

    #[test]
    fn scheduled_payload_shape() {
        let v = scheduled_payload(&AppointmentRequest::default());
        assert_eq!(v["status"], "scheduled");
        assert_eq!(v["appointment"]["name"], "");
        assert_eq!(v["appointment"]["reason"], "");
        assert_eq!(v["confirmation"], "Appointment scheduled for  on  at ");
    }

    #[test]
    fn transferred_payload_shape() {
        let v = transferred_payload("dentist");
        assert_eq!(v["status"], "transferred");
        assert_eq!(v["target_agent"], "dentist");
        assert_eq!(v["message"], "Transferring to dentist");
    }
}
