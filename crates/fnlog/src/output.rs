use fnlog_core::model::log::{LogEntry, LogPreview};
use fnlog_core::query::{LogsResponse, StatsResponse};
use owo_colors::OwoColorize;

pub fn print_logs_human(v: &LogsResponse) {
    match v {
        LogsResponse::Entries(entries) => {
            for entry in entries {
                print_row(&entry.preview());
                println!("    id={}", entry.id.bright_black());
            }
        }
        LogsResponse::Previews(previews) => previews.iter().for_each(print_row),
    }
    println!("-- {} logs --", v.len());
}

pub fn print_entry_human(entry: &LogEntry) {
    print_row(&entry.preview());
    println!("id={}", entry.id);
    println!("module={}", entry.module);
    print_opt("args", entry.args.as_deref());
    if let Some(kwargs) = &entry.kwargs {
        println!("kwargs={kwargs}");
    }
    print_opt("result", entry.result.as_deref());
    print_opt("error", entry.error.as_deref());
    print_opt("error_type", entry.error_type.as_deref());
    print_opt("trace", entry.trace_id.as_deref());
    print_opt("span", entry.span_id.as_deref());
    print_opt("scope", entry.scope_name.as_deref());
}

pub fn print_stats_human(v: &StatsResponse) {
    println!(
        "logs={} functions={}",
        v.total_logs, v.unique_functions
    );
    for name in &v.function_names {
        println!("  {}", name.cyan());
    }
}

fn print_row(row: &LogPreview) {
    let status = match row.status.as_str() {
        "success" => row.status.green().to_string(),
        "error" => row.status.red().to_string(),
        other => other.to_string(),
    };
    println!(
        "{} {} {} {}ms {} | {}",
        row.timestamp,
        level_label(&row.level),
        row.function_name.cyan(),
        row.duration_ms,
        status,
        row.message
    );
}

fn level_label(level: &str) -> String {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => level.blue().to_string(),
        "DEBUG" => level.bright_black().to_string(),
        "INFO" => level.green().to_string(),
        "WARN" | "WARNING" => level.yellow().to_string(),
        "ERROR" => level.red().to_string(),
        "FATAL" | "CRITICAL" => level.magenta().to_string(),
        _ => level.to_string(),
    }
}

fn print_opt(key: &str, value: Option<&str>) {
    if let Some(value) = value {
        println!("{key}={value}");
    }
}
