use serde::Serialize;
use std::collections::BTreeMap;

/// Reserved command id meaning "intentionally do nothing". Plans may include
/// it (e.g. when the planner decides a requested step is unnecessary); the
/// executor skips it without spawning a process.
pub const NO_OP_COMMAND: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

const BUILTIN_TOOLS: &[ToolDefinition] = &[
    ToolDefinition {
        id: "ffmpeg",
        title: "FFmpeg",
        description: "Transcode, trim, filter, and mux audio/video streams",
    },
    ToolDefinition {
        id: "ffprobe",
        title: "FFprobe",
        description: "Inspect media containers, streams, and metadata",
    },
    ToolDefinition {
        id: "magick",
        title: "ImageMagick",
        description: "Convert, resize, and compose still images",
    },
    ToolDefinition {
        id: "gifsicle",
        title: "Gifsicle",
        description: "Optimize and edit animated GIFs",
    },
    ToolDefinition {
        id: "sox",
        title: "SoX",
        description: "Process and convert audio files",
    },
    ToolDefinition {
        id: NO_OP_COMMAND,
        title: "No operation",
        description: "Explicitly do nothing for this step",
    },
];

/// Process-wide set of executable commands, fixed at startup. Safe for
/// concurrent reads; never mutated after construction.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: &'static [ToolDefinition],
}

impl ToolRegistry {
    pub fn builtin() -> Self {
        Self {
            tools: BUILTIN_TOOLS,
        }
    }

    /// True for every known command id, the no-op sentinel included.
    pub fn has_command(&self, id: &str) -> bool {
        self.tools.iter().any(|tool| tool.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|tool| tool.id == id)
    }

    /// Tools that actually spawn a process, i.e. everything but the no-op
    /// sentinel. Used to advertise capabilities to the planner and callers.
    pub fn executable_tools(&self) -> Vec<&ToolDefinition> {
        self.tools
            .iter()
            .filter(|tool| tool.id != NO_OP_COMMAND)
            .collect()
    }
}

/// Resolve the binary invoked for each tool id. The id doubles as the binary
/// name unless overridden by settings or a `CLIPWRIGHT_TOOL_BIN_<ID>`
/// environment variable (the env var wins).
pub fn resolve_tool_binaries(
    registry: &ToolRegistry,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut binaries = BTreeMap::new();
    for tool in registry.executable_tools() {
        let env_key = format!("CLIPWRIGHT_TOOL_BIN_{}", tool.id.to_ascii_uppercase());
        let binary = std::env::var(&env_key)
            .ok()
            .or_else(|| overrides.get(tool.id).cloned())
            .unwrap_or_else(|| tool.id.to_string());
        binaries.insert(tool.id.to_string(), binary);
    }
    binaries
}
