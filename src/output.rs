use crate::models::RunSummary;
use clap::ValueEnum;

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print the run summary in the specified format
pub fn print_summary(summary: &RunSummary, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print!("{}", render_plain(summary)),
        OutputFormat::Json => print_json(summary),
    }
}

/// Render the summary as plain text
fn render_plain(summary: &RunSummary) -> String {
    let mut out = String::new();

    for group in &summary.groups {
        out.push_str(&format!("=== {} ===\n", group.title));
        out.push_str(&format!("Directory: {}\n", group.directory.display()));

        if group.prompts.is_empty() {
            out.push_str("No prompts.\n\n");
            continue;
        }

        out.push_str(&format!("{:<6} {:<9} {:<7} {}\n", "Prompt", "Attempts", "Unique", "Text"));
        out.push_str(&format!("{}\n", "-".repeat(45)));
        for prompt in &group.prompts {
            out.push_str(&format!(
                "{:<6} {:<9} {:<7} {}\n",
                prompt.index, prompt.attempts, prompt.unique_responses, prompt.prompt
            ));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "{} unique responses saved across {} test groups\n",
        summary.total_files(),
        summary.groups.len()
    ));
    out
}

/// Render the summary as pretty-printed JSON
fn render_json(summary: &RunSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}

/// Print the summary as JSON
fn print_json(summary: &RunSummary) {
    match render_json(summary) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing summary to JSON: {}", e),
    }
}
