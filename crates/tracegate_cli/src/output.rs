//! Terminal output helpers: styled text for humans, one JSON object per line for machines.
//!
//! `console` handles colors (respects NO_COLOR, auto-disables when piped).

use std::sync::atomic::{AtomicBool, Ordering};

use console::style;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::cli::OutputFormat;

// ── Global format flag ─────────────────────────────────────────────

static JSON_MODE: AtomicBool = AtomicBool::new(false);

pub fn init(format: OutputFormat) {
    if matches!(format, OutputFormat::Json) {
        JSON_MODE.store(true, Ordering::Relaxed);
    }
}

fn is_json() -> bool {
    JSON_MODE.load(Ordering::Relaxed)
}

// ── JSON envelope ──────────────────────────────────────────────────

#[derive(Serialize)]
struct Msg<'a> {
    level: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a JsonValue>,
}

fn render_json(level: &str, message: &str, data: Option<&JsonValue>) -> String {
    let msg = Msg {
        level,
        message,
        data,
    };
    serde_json::to_string(&msg)
        .unwrap_or_else(|_| format!("{{\"level\":\"{level}\",\"message\":\"{message}\"}}"))
}

fn emit_json(level: &str, message: &str, data: Option<&JsonValue>) {
    println!("{}", render_json(level, message, data));
}

// ── Public helpers ─────────────────────────────────────────────────

pub fn header(text: &str) {
    if is_json() {
        emit_json("info", text, None);
    } else {
        println!("{}", style(text).bold().cyan());
    }
}

pub fn success(text: &str) {
    if is_json() {
        emit_json("success", text, None);
    } else {
        println!("{} {}", style("✓").green(), style(text).bright());
    }
}

pub fn error(text: &str) {
    if is_json() {
        eprintln!("{}", render_json("error", text, None));
    } else {
        eprintln!("{} {}", style("✗").red(), style(text).bright());
    }
}

pub fn warning(text: &str) {
    if is_json() {
        emit_json("warning", text, None);
    } else {
        println!("{} {}", style("!").yellow(), style(text).bright());
    }
}

pub fn dim(text: &str) {
    if is_json() {
        emit_json("info", text, None);
    } else {
        println!("{}", style(text).dim());
    }
}

/// Print a key-value pair with styled key.
pub fn kv(key: &str, value: &str) {
    if is_json() {
        let data = serde_json::json!({ key: value });
        emit_json("info", key, Some(&data));
    } else {
        println!("  {} {}", style(key).cyan().bold(), value);
    }
}

/// Emit an arbitrary serializable value as structured output.
pub fn data<T: Serialize>(label: &str, value: &T) {
    let json_val = serde_json::to_value(value).unwrap_or(JsonValue::Null);
    if is_json() {
        emit_json("data", label, Some(&json_val));
    } else {
        let formatted =
            serde_json::to_string_pretty(&json_val).unwrap_or_else(|_| format!("{label}: <?>"));
        println!("{} {}", style(label).cyan().bold(), formatted);
    }
}
