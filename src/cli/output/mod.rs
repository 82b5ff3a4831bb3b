//! Output formatting utilities for the CLI.

pub mod progress;
pub mod table;

use serde::Serialize;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Format a rate as a percentage, or `-` when unset.
pub fn format_rate(rate: Option<f64>) -> String {
    rate.map_or_else(|| "-".to_string(), |r| format!("{r:.2}%"))
}

/// Format an elapsed duration, or `-` when unset.
pub fn format_elapsed(elapsed: Option<std::time::Duration>) -> String {
    elapsed.map_or_else(
        || "-".to_string(),
        |d| {
            let ms = d.as_millis();
            if ms < 1_000 {
                format!("{ms}ms")
            } else {
                format!("{:.1}s", d.as_secs_f64())
            }
        },
    )
}
