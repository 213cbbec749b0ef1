use std::str::FromStr;

use serde_json::Value;

use crate::types::GhostMode;

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Ping { t: f64 },
    SetMode { mode: GhostMode },
    Restart,
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        "set_mode" => {
            let raw_mode = object.get("mode")?.as_str()?;
            let mode = GhostMode::from_str(raw_mode.trim()).ok()?;
            Some(ParsedClientMessage::SetMode { mode })
        }
        "restart" => Some(ParsedClientMessage::Restart),
        _ => None,
    }
}
