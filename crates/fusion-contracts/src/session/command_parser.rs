use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, NO_ARG_COMMANDS, OPTIONAL_ARG_COMMANDS, SLOT_ONLY_COMMANDS, SLOT_PATH_COMMANDS,
    SLOT_SELECT_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionCommand {
    pub action: String,
    pub raw: String,
    pub args: BTreeMap<String, Value>,
}

impl SessionCommand {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            args: BTreeMap::new(),
        }
    }

    fn with_arg(mut self, key: &str, value: impl Into<String>) -> Self {
        self.args
            .insert(key.to_string(), Value::String(value.into()));
        self
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn join_path(parts: &[String]) -> String {
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

pub fn parse_command(text: &str) -> SessionCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return SessionCommand::new("noop", text);
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        return SessionCommand::new("unknown", text).with_arg("arg", raw_trimmed);
    };

    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    if command_len == 0 {
        return SessionCommand::new("unknown", text).with_arg("arg", raw_trimmed);
    }
    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    if let Some((spec, slot)) = SLOT_SELECT_COMMANDS
        .iter()
        .find(|(spec, _)| spec.command == command)
    {
        return SessionCommand::new(spec.action, text)
            .with_arg("slot", *slot)
            .with_arg("path", join_path(&split_args(arg)));
    }

    if let Some(action) = find_action(&command, SLOT_PATH_COMMANDS) {
        let parts = split_args(arg);
        let slot = parts.first().cloned().unwrap_or_default();
        let path = parts.get(1..).map(join_path).unwrap_or_default();
        return SessionCommand::new(action, text)
            .with_arg("slot", slot)
            .with_arg("path", path);
    }

    if let Some(action) = find_action(&command, SLOT_ONLY_COMMANDS) {
        return SessionCommand::new(action, text).with_arg("slot", arg);
    }

    if let Some((spec, key)) = OPTIONAL_ARG_COMMANDS
        .iter()
        .find(|(spec, _)| spec.command == command)
    {
        return SessionCommand::new(spec.action, text).with_arg(key, join_path(&split_args(arg)));
    }

    if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
        return SessionCommand::new(action, text);
    }

    SessionCommand::new("unknown", text)
        .with_arg("command", command)
        .with_arg("arg", arg)
}
