//! Function-calling tool schemas sent with every code-generation request.

use serde::Serialize;
use serde_json::json;

/// Name of the tool the model uses to emit one file
pub const CREATE_CODE_ARTIFACT: &str = "create_code_artifact";

/// Name of the tool the model uses to describe how to run a project
pub const CREATE_PROJECT_STRUCTURE: &str = "create_project_structure";

/// OpenAI function-calling tool definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// `create_code_artifact(filename, language, content, description?)`
pub fn create_code_artifact() -> ToolDefinition {
    ToolDefinition::function(
        CREATE_CODE_ARTIFACT,
        "Creates a code artifact for any programming language or file type. \
         Use this tool once for every file of a project.",
        json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "File name including a relative path if needed (e.g. package.json, src/App.js, styles/main.css)"
                },
                "language": {
                    "type": "string",
                    "description": "File type or language: html, css, js, jsx, ts, tsx, json, md, yaml, ..."
                },
                "content": {
                    "type": "string",
                    "description": "The complete file content, never abbreviated"
                },
                "description": {
                    "type": "string",
                    "description": "Short description of what the file does"
                }
            },
            "required": ["filename", "content"]
        }),
    )
}

/// `create_project_structure(project_type, install_command, start_command, port?)`
pub fn create_project_structure() -> ToolDefinition {
    ToolDefinition::function(
        CREATE_PROJECT_STRUCTURE,
        "Describes the structure of the generated project",
        json!({
            "type": "object",
            "properties": {
                "project_type": {
                    "type": "string",
                    "description": "Kind of project (React, Next.js, Vanilla HTML, Node.js, ...)"
                },
                "install_command": {
                    "type": "string",
                    "description": "Command that installs dependencies (npm install, yarn install, ...)"
                },
                "start_command": {
                    "type": "string",
                    "description": "Command that starts the app (npm start, npm run dev, ...)"
                },
                "port": {
                    "type": "number",
                    "description": "Port the app listens on (3000, 8080, ...)"
                }
            },
            "required": ["project_type", "install_command", "start_command"]
        }),
    )
}

/// Tools declared on a code-generation request
pub fn code_generation_tools() -> Vec<ToolDefinition> {
    vec![create_code_artifact(), create_project_structure()]
}
