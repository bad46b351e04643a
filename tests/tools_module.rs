use clipwright::tools::{resolve_tool_binaries, ToolRegistry, NO_OP_COMMAND};
use std::collections::BTreeMap;

#[test]
fn tools_module_knows_builtin_commands_and_sentinel() {
    let registry = ToolRegistry::builtin();
    assert!(registry.has_command("ffmpeg"));
    assert!(registry.has_command("ffprobe"));
    assert!(registry.has_command(NO_OP_COMMAND));
    assert!(!registry.has_command("rm"));

    let ffmpeg = registry.get("ffmpeg").expect("ffmpeg definition");
    assert_eq!(ffmpeg.title, "FFmpeg");
}

#[test]
fn tools_module_executable_listing_excludes_no_op() {
    let registry = ToolRegistry::builtin();
    let executable = registry.executable_tools();
    assert!(!executable.is_empty());
    assert!(executable.iter().all(|tool| tool.id != NO_OP_COMMAND));
}

#[test]
fn tools_module_binary_resolution_precedence() {
    let registry = ToolRegistry::builtin();

    // Default: the tool id doubles as the binary name.
    let defaults = resolve_tool_binaries(&registry, &BTreeMap::new());
    assert_eq!(defaults.get("ffmpeg").map(String::as_str), Some("ffmpeg"));
    assert!(!defaults.contains_key(NO_OP_COMMAND));

    // Settings overrides apply.
    let mut overrides = BTreeMap::new();
    overrides.insert("ffmpeg".to_string(), "/opt/ffmpeg".to_string());
    let with_settings = resolve_tool_binaries(&registry, &overrides);
    assert_eq!(
        with_settings.get("ffmpeg").map(String::as_str),
        Some("/opt/ffmpeg")
    );

    // Environment wins over settings.
    std::env::set_var("CLIPWRIGHT_TOOL_BIN_FFMPEG", "/env/ffmpeg");
    let with_env = resolve_tool_binaries(&registry, &overrides);
    std::env::remove_var("CLIPWRIGHT_TOOL_BIN_FFMPEG");
    assert_eq!(
        with_env.get("ffmpeg").map(String::as_str),
        Some("/env/ffmpeg")
    );
}
