//! Turning a child process's output into core values.

use std::sync::LazyLock;

use regex::Regex;

use crate::checkpoint::DiscoveredItem;
use crate::retry::OperationFailure;

static HTTP_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)HTTP Error (\d{3})").expect("status regex is valid") // static pattern
});

/// Substitute `{source}` and `{identity}` in every argument.
pub fn render_args(templates: &[String], source: &str, identity: &str) -> Vec<String> {
    templates
        .iter()
        .map(|t| t.replace("{source}", source).replace("{identity}", identity))
        .collect()
}

/// Status code in text like `HTTP Error 403: Forbidden`.
pub fn status_from_text(text: &str) -> Option<u16> {
    HTTP_STATUS
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Build the failure for a non-zero exit: the last `ERROR` line of stderr,
/// else its last non-empty line, else a description of the exit.
pub fn failure_from_output(stderr: &str, exit: &str) -> OperationFailure {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let message = lines
        .iter()
        .rev()
        .find(|l| l.contains("ERROR"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_else(|| format!("collaborator exited with {}", exit));
    OperationFailure::new(status_from_text(&message), message)
}

/// One enumeration line: `id` or `id<TAB>title`. Blank lines yield nothing.
pub fn parse_item_line(line: &str) -> Option<DiscoveredItem> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (id, title) = match line.split_once('\t') {
        Some((id, title)) => (id.trim(), Some(title.trim())),
        None => (line.trim(), None),
    };
    if id.is_empty() {
        return None;
    }
    let item = DiscoveredItem::new(id);
    Some(match title {
        Some(t) if !t.is_empty() && t != "NA" => item.with_title(t),
        _ => item,
    })
}
