use crate::task::TaskRequest;
use crate::tools::{ToolRegistry, NO_OP_COMMAND};

pub const PLANNER_SYSTEM_PROMPT: &str = "You are a media processing planner. \
You translate a user's task into a json command plan executed verbatim by a runner. \
Respond with a single json object and nothing else.";

/// Assemble the user prompt for the planner: the capability list, the task,
/// the attached files, and the response contract.
pub fn render_planning_prompt(registry: &ToolRegistry, request: &TaskRequest) -> String {
    let mut sections = Vec::new();

    let mut tools = String::from("Available commands:\n");
    for tool in registry.executable_tools() {
        tools.push_str(&format!("- {} ({}): {}\n", tool.id, tool.title, tool.description));
    }
    tools.push_str(&format!(
        "- {NO_OP_COMMAND}: use when a step should intentionally do nothing\n"
    ));
    sections.push(tools);

    sections.push(format!("Task:\n{}\n", request.task.trim()));

    if !request.files.is_empty() {
        let mut files = String::from("Input files (reference by absolute path):\n");
        for file in &request.files {
            files.push_str(&format!(
                "- {} ({}, {} bytes) at {}\n",
                file.name, file.media_type, file.size, file.path
            ));
        }
        sections.push(files);
    }

    sections.push(format!(
        "Every output file must be written inside: {}\n",
        request.output_dir.display()
    ));

    sections.push(
        "Respond with json matching this shape:\n\
         {\"overview\": \"one-line summary\",\n \
          \"followUp\": \"suggestion for a next step, or empty\",\n \
          \"steps\": [{\"command\": \"ffmpeg\", \"arguments\": [\"-i\", \"...\"],\n \
                      \"reasoning\": \"why this step\",\n \
                      \"outputs\": [{\"path\": \"...\", \"description\": \"...\"}],\n \
                      \"title\": \"optional short label\"}]}\n\
         Arguments are passed to the command verbatim, in order, one array element each.\n"
            .to_string(),
    );

    sections.join("\n")
}
