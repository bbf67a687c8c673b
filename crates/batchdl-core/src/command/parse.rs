use serde_json::{Map, Value};

use crate::registry::TransferId;

/// One inbound control instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Cancel(TransferId),
    Resume(TransferId),
    Remove(TransferId),
    /// Drop every transfer in a terminal state.
    Clear,
}

impl ControlCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ControlCommand::Cancel(_) => "cancel",
            ControlCommand::Resume(_) => "resume",
            ControlCommand::Remove(_) => "remove",
            ControlCommand::Clear => "clear",
        }
    }

    pub fn id(&self) -> Option<TransferId> {
        match *self {
            ControlCommand::Cancel(id) | ControlCommand::Resume(id) | ControlCommand::Remove(id) => {
                Some(id)
            }
            ControlCommand::Clear => None,
        }
    }

    /// Wire form, `{"command": .., "id": ..}`.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("command".into(), Value::from(self.name()));
        if let Some(id) = self.id() {
            obj.insert("id".into(), Value::from(id));
        }
        Value::Object(obj)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ControlParseError {
    #[error("not a JSON object")]
    NotAnObject,
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("missing command")]
    MissingCommand,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("command {0} needs a non-negative integer id")]
    MissingId(&'static str),
}

/// Parse one raw control message. Field names and command values are
/// matched case-insensitively; extra fields are ignored.
pub fn parse_control_message(raw: &str) -> Result<ControlCommand, ControlParseError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ControlParseError::Json(e.to_string()))?;
    parse_control_value(&value)
}

pub fn parse_control_value(value: &Value) -> Result<ControlCommand, ControlParseError> {
    let obj = value.as_object().ok_or(ControlParseError::NotAnObject)?;
    let command = field(obj, "command")
        .and_then(Value::as_str)
        .ok_or(ControlParseError::MissingCommand)?
        .trim()
        .to_ascii_lowercase();
    let id = field(obj, "id").and_then(parse_id);

    let with_id = |name: &'static str, make: fn(TransferId) -> ControlCommand| {
        id.map(make).ok_or(ControlParseError::MissingId(name))
    };
    match command.as_str() {
        "cancel" => with_id("cancel", ControlCommand::Cancel),
        "resume" => with_id("resume", ControlCommand::Resume),
        "remove" => with_id("remove", ControlCommand::Remove),
        "clear" => Ok(ControlCommand::Clear),
        _ => Err(ControlParseError::UnknownCommand(command)),
    }
}

/// Case-insensitive key lookup. An exact match wins over a folded one.
pub fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).or_else(|| {
        obj.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

/// Integer ids, or strings holding one.
fn parse_id(v: &Value) -> Option<TransferId> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_command() {
        assert_eq!(
            parse_control_message(r#"{"command":"cancel","id":4}"#),
            Ok(ControlCommand::Cancel(4))
        );
        assert_eq!(
            parse_control_message(r#"{"command":"resume","id":4}"#),
            Ok(ControlCommand::Resume(4))
        );
        assert_eq!(
            parse_control_message(r#"{"command":"remove","id":9}"#),
            Ok(ControlCommand::Remove(9))
        );
        assert_eq!(
            parse_control_message(r#"{"command":"clear"}"#),
            Ok(ControlCommand::Clear)
        );
    }

    #[test]
    fn field_names_and_values_are_case_insensitive() {
        assert_eq!(
            parse_control_message(r#"{"Command":"Cancel","ID":2}"#),
            Ok(ControlCommand::Cancel(2))
        );
        assert_eq!(
            parse_control_message(r#"{"COMMAND":"CLEAR"}"#),
            Ok(ControlCommand::Clear)
        );
    }

    #[test]
    fn string_id_accepted() {
        assert_eq!(
            parse_control_message(r#"{"command":"resume","id":"12"}"#),
            Ok(ControlCommand::Resume(12))
        );
    }

    #[test]
    fn clear_ignores_id() {
        assert_eq!(
            parse_control_message(r#"{"command":"clear","id":3}"#),
            Ok(ControlCommand::Clear)
        );
    }

    #[test]
    fn malformed_messages_rejected() {
        assert!(matches!(
            parse_control_message("not json"),
            Err(ControlParseError::Json(_))
        ));
        assert_eq!(
            parse_control_message("[1,2]"),
            Err(ControlParseError::NotAnObject)
        );
        assert_eq!(
            parse_control_message(r#"{"id":1}"#),
            Err(ControlParseError::MissingCommand)
        );
        assert_eq!(
            parse_control_message(r#"{"command":"explode","id":1}"#),
            Err(ControlParseError::UnknownCommand("explode".into()))
        );
        assert_eq!(
            parse_control_message(r#"{"command":"cancel"}"#),
            Err(ControlParseError::MissingId("cancel"))
        );
        assert_eq!(
            parse_control_message(r#"{"command":"cancel","id":-1}"#),
            Err(ControlParseError::MissingId("cancel"))
        );
        assert_eq!(
            parse_control_message(r#"{"command":"cancel","id":1.5}"#),
            Err(ControlParseError::MissingId("cancel"))
        );
    }

    #[test]
    fn to_json_parses_back() {
        for cmd in [ControlCommand::Remove(7), ControlCommand::Clear] {
            assert_eq!(parse_control_value(&cmd.to_json()), Ok(cmd));
        }
    }
}
