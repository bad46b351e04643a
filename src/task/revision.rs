use crate::exec::StepStatus;
use crate::session::{SessionRecord, SessionStore};
use crate::shared::ids::stable_file_id;
use crate::shared::mime::media_type_for_path;
use crate::task::AgentFile;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

const COMMAND_SUMMARY_LIMIT: usize = 120;

/// A follow-up task derived from a prior session plus a new complaint.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionRequest {
    pub task: String,
    pub files: Vec<AgentFile>,
}

/// Reconstruct an augmented task request from a prior session's record and
/// a fresh complaint: the original request restated, a table of every
/// attempt so far, and the prior attempt's surviving files re-attached as
/// inputs.
pub fn compose_revision(
    store: &SessionStore,
    base: &SessionRecord,
    complaint: &str,
) -> RevisionRequest {
    RevisionRequest {
        task: compose_task_text(store, base, complaint),
        files: reattach_files(base),
    }
}

/// Union of the base session's uploads and its resolved outputs that still
/// exist as regular files, deduplicated by absolute path (first occurrence
/// wins). Entries whose backing file is gone are silently dropped.
fn reattach_files(base: &SessionRecord) -> Vec<AgentFile> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut files = Vec::new();

    for uploaded in &base.uploaded_files {
        attach_path(&uploaded.path, &mut seen, &mut files);
    }
    if let Some(result) = &base.result {
        for output in &result.resolved_outputs {
            attach_path(&output.absolute_path, &mut seen, &mut files);
        }
    }
    files
}

fn attach_path(path_text: &str, seen: &mut BTreeSet<String>, files: &mut Vec<AgentFile>) {
    let path = Path::new(path_text);
    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    if !metadata.is_file() {
        return;
    }
    if !seen.insert(path_text.to_string()) {
        return;
    }
    let name = path
        .file_name()
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_text.to_string());
    files.push(AgentFile {
        id: stable_file_id(path),
        name,
        path: path_text.to_string(),
        size: metadata.len(),
        media_type: media_type_for_path(path).to_string(),
    });
}

fn compose_task_text(store: &SessionStore, base: &SessionRecord, complaint: &str) -> String {
    let ancestry = store.collect_ancestry(base);
    let original_task = ancestry
        .first()
        .map(|record| record.task.clone())
        .unwrap_or_else(|| base.task.clone());

    let mut table = String::from(
        "| Version | Outputs | Complaint | Commands |\n|---|---|---|---|\n",
    );
    let newest = ancestry.len().saturating_sub(1);
    for (generation, record) in ancestry.iter().enumerate() {
        let label = if generation == 0 {
            "Original".to_string()
        } else {
            format!("Rev.{generation}")
        };
        // Each row carries the complaint raised *against* that attempt; for
        // the newest row that is the complaint being filed right now, which
        // takes precedence over anything previously recorded.
        let row_complaint = if generation == newest {
            complaint.trim().to_string()
        } else {
            ancestry
                .get(generation + 1)
                .and_then(|next| next.complaint_context.clone())
                .unwrap_or_default()
        };
        table.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            label,
            summarize_outputs(record),
            table_cell(&row_complaint),
            table_cell(&summarize_commands(record)),
        ));
    }

    format!(
        "{original_task}\n\nThis request has been attempted before. Revision history:\n\n{table}\n\
         Address the issues noted above in a new attempt. Files produced by the previous \
         attempt are attached as inputs and may be referenced by name."
    )
}

fn summarize_outputs(record: &SessionRecord) -> String {
    let Some(result) = &record.result else {
        return "none".to_string();
    };
    let names: Vec<String> = result
        .resolved_outputs
        .iter()
        .filter(|output| output.exists)
        .map(|output| {
            Path::new(&output.absolute_path)
                .file_name()
                .map(|v| v.to_string_lossy().into_owned())
                .unwrap_or_else(|| output.absolute_path.clone())
        })
        .collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

/// Executed commands, or planned commands when the attempt never ran,
/// truncated to keep the history table scannable.
fn summarize_commands(record: &SessionRecord) -> String {
    let mut lines: Vec<String> = Vec::new();
    if let Some(result) = &record.result {
        lines = result
            .steps
            .iter()
            .filter(|step| step.status == StepStatus::Executed)
            .map(|step| format!("{} {}", step.command, step.arguments.join(" ")))
            .collect();
    }
    if lines.is_empty() {
        if let Some(plan) = &record.plan {
            lines = plan
                .steps
                .iter()
                .map(|step| format!("{} {}", step.command, step.arguments.join(" ")))
                .collect();
        }
    }
    if lines.is_empty() {
        return "none".to_string();
    }
    truncate_summary(&lines.join("; "), COMMAND_SUMMARY_LIMIT)
}

fn truncate_summary(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let truncated: String = text.chars().take(limit).collect();
    format!("{}...", truncated.trim_end())
}

fn table_cell(text: &str) -> String {
    let cleaned = text.replace(['\n', '|'], " ");
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "-".to_string()
    } else {
        trimmed.to_string()
    }
}
