//! Output formatting for discovered endpoints.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: the endpoint catalogue, exactly as handed to downstream tools

use colored::*;
use std::path::{Path, PathBuf};

use crate::discovery::{Diagnostic, ScanOutcome};
use crate::endpoint::{EndpointDescriptor, HttpMethod, ParamType};

/// Render the catalogue as a pretty-printed JSON array.
pub fn format_json(endpoints: &[EndpointDescriptor]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(endpoints)?)
}

/// Write the catalogue to stdout as JSON.
pub fn write_json(endpoints: &[EndpointDescriptor]) -> anyhow::Result<()> {
    println!("{}", format_json(endpoints)?);
    Ok(())
}

/// Write scan results in human-readable form.
pub fn write_pretty(path: &str, outcome: &ScanOutcome, root: &Path) {
    write_header(path);

    print!("  {}", "Entry points: ".dimmed());
    if outcome.entry_points.is_empty() {
        println!("{}", "none found".yellow());
    } else {
        println!("{}", display_relative(&outcome.entry_points[0], root));
        for entry in &outcome.entry_points[1..] {
            println!("                {}", display_relative(entry, root));
        }
    }
    print!("  {}", "Files analyzed: ".dimmed());
    println!("{}", outcome.analyzed_files.len());
    println!();

    if !outcome.endpoints.is_empty() {
        for endpoint in &outcome.endpoints {
            write_endpoint(endpoint);
        }
        println!();
    }

    if !outcome.diagnostics.is_empty() {
        write_diagnostics(&outcome.diagnostics, root);
        println!();
    }

    write_final_status(outcome);
    println!();
}

/// Write the entry point candidates, one per line.
pub fn write_entries(path: &str, entries: &[PathBuf], root: &Path) {
    write_header(path);
    if entries.is_empty() {
        println!("  {}", "No entry point found".yellow());
    } else {
        for (i, entry) in entries.iter().enumerate() {
            println!("  {:>3}. {}", i + 1, display_relative(entry, root));
        }
    }
    println!();
}

fn write_header(path: &str) {
    println!();
    print!("  ");
    print!("{}", "routescout".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("  {}", "Scanning: ".dimmed());
    println!("{}", path);
}

fn write_endpoint(endpoint: &EndpointDescriptor) {
    println!("  {} {}", colored_method(endpoint.method), endpoint.url.bold());

    write_fields("params", &endpoint.param_types);
    write_fields("query", &endpoint.query_param_types);
    write_fields("body", &endpoint.body_param_types);
    if !endpoint.headers.is_empty() {
        println!(
            "          {} {}",
            "headers:".dimmed(),
            endpoint.headers.join(", ")
        );
    }
}

fn write_fields(label: &str, fields: &[ParamType]) {
    if fields.is_empty() {
        return;
    }
    let rendered: Vec<String> = fields
        .iter()
        .map(|f| {
            let optional = if f.required { "" } else { "?" };
            format!("{}{}: {}", f.name, optional, f.field_type)
        })
        .collect();
    println!(
        "          {} {}",
        format!("{}:", label).dimmed(),
        rendered.join(", ")
    );
}

fn colored_method(method: HttpMethod) -> ColoredString {
    let label = format!("{:<7}", method.as_str());
    match method {
        HttpMethod::Get => label.green().bold(),
        HttpMethod::Post => label.yellow().bold(),
        HttpMethod::Put => label.blue().bold(),
        HttpMethod::Patch => label.cyan().bold(),
        HttpMethod::Delete => label.red().bold(),
        _ => label.magenta().bold(),
    }
}

fn write_diagnostics(diagnostics: &[Diagnostic], root: &Path) {
    println!(
        "  {}",
        format!("{} file(s) skipped:", diagnostics.len()).yellow()
    );
    for diagnostic in diagnostics {
        println!(
            "    {} {}  {}",
            "⚠".yellow(),
            display_relative(&diagnostic.path, root),
            diagnostic.message.dimmed()
        );
    }
}

fn write_final_status(outcome: &ScanOutcome) {
    let count = outcome.endpoints.len();
    if count > 0 {
        println!(
            "  {} {} endpoint{} discovered",
            "✓".green(),
            count,
            if count == 1 { "" } else { "s" }
        );
    } else {
        println!("  {} no endpoints discovered", "✗".red());
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::FieldType;

    #[test]
    fn test_json_is_plain_catalogue() {
        let mut endpoint = EndpointDescriptor::new(HttpMethod::Post, "/users");
        endpoint
            .body_param_types
            .push(ParamType::new("age", FieldType::Number, true));
        endpoint.refresh_data_type();

        let json = format_json(&[endpoint]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["method"], "POST");
        assert_eq!(value[0]["requestDataType"], "body");
        assert_eq!(value[0]["bodyParamTypes"][0]["name"], "age");
        assert_eq!(value[0]["bodyParamTypes"][0]["type"], "number");
    }

    #[test]
    fn test_empty_catalogue() {
        assert_eq!(format_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_display_relative() {
        assert_eq!(
            display_relative(Path::new("/p/src/server.js"), Path::new("/p")),
            "src/server.js"
        );
        assert_eq!(
            display_relative(Path::new("/elsewhere/a.js"), Path::new("/p")),
            "/elsewhere/a.js"
        );
    }
}
