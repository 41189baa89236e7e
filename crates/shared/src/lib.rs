pub mod artifact;
pub mod history;

pub use artifact::{Artifact, ArtifactKind};

pub mod settings {
    use serde::{Deserialize, Serialize};

    /// Model variants offered by the completion API
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub enum ModelVariant {
        #[default]
        #[serde(rename = "glm-4.5-chat")]
        Chat,
        #[serde(rename = "glm-4.5-long")]
        Long,
        #[serde(rename = "glm-4.5-air")]
        Air,
        #[serde(rename = "glm-4.5-flash")]
        Flash,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    #[serde(rename_all = "kebab-case")]
    pub enum ThinkingMode {
        #[default]
        Thinking,
        NonThinking,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    #[serde(rename_all = "lowercase")]
    pub enum Theme {
        Light,
        Dark,
        #[default]
        Auto,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    #[serde(rename_all = "lowercase")]
    pub enum FontSize {
        Small,
        #[default]
        Medium,
        Large,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    #[serde(rename_all = "lowercase")]
    pub enum UiLanguage {
        #[default]
        De,
        En,
        Zh,
    }

    /// Completion endpoint configuration
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ApiSettings {
        pub base_url: String,
        pub model: String,
        pub api_key: Option<String>,
        pub max_tokens: u32,
        pub temperature: f32,
        /// Ceiling for one completion request
        pub timeout_secs: u64,
    }

    impl Default for ApiSettings {
        fn default() -> Self {
            Self {
                base_url: "https://api.z.ai/api/paas/v4".into(),
                model: "glm-4.5".into(),
                api_key: None,
                max_tokens: 4096,
                temperature: 0.7,
                timeout_secs: 60,
            }
        }
    }

    /// Remote sandbox configuration
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct SandboxSettings {
        pub api_url: String,
        pub api_key: Option<String>,
        pub image: String,
        pub public: bool,
        pub command_timeout_secs: u64,
    }

    impl Default for SandboxSettings {
        fn default() -> Self {
            Self {
                api_url: "https://api.daytona.io/v1".into(),
                api_key: None,
                image: "node:20".into(),
                public: true,
                command_timeout_secs: 180,
            }
        }
    }

    /// Everything persisted under the settings key. Fields missing from a
    /// stored blob take their default values.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct AppSettings {
        pub model: ModelVariant,
        pub mode: ThinkingMode,
        pub theme: Theme,
        /// 0-100
        pub chat_background_transparency: u8,
        /// 0-100, desktop shell only
        pub window_transparency: u8,
        pub font_size: FontSize,
        pub language: UiLanguage,
        pub auto_scroll: bool,
        pub sound_enabled: bool,
        pub show_timestamps: bool,
        pub compact_mode: bool,
        pub api: ApiSettings,
        pub sandbox: SandboxSettings,
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                model: ModelVariant::default(),
                mode: ThinkingMode::default(),
                theme: Theme::default(),
                chat_background_transparency: 89,
                window_transparency: 90,
                font_size: FontSize::default(),
                language: UiLanguage::default(),
                auto_scroll: true,
                sound_enabled: true,
                show_timestamps: true,
                compact_mode: false,
                api: ApiSettings::default(),
                sandbox: SandboxSettings::default(),
            }
        }
    }

    impl AppSettings {
        /// Clamp percentage fields into 0-100
        pub fn normalized(mut self) -> Self {
            self.chat_background_transparency = self.chat_background_transparency.min(100);
            self.window_transparency = self.window_transparency.min(100);
            self
        }
    }
}

pub mod agent_api {
    use crate::artifact::Artifact;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        User,
        Assistant,
        System,
    }

    impl Role {
        pub fn as_str(&self) -> &'static str {
            match self {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ToolCallFunction {
        pub name: String,
        /// JSON-encoded arguments exactly as the model sent them
        pub arguments: String,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ToolCall {
        pub id: String,
        #[serde(rename = "type", default = "default_call_type")]
        pub call_type: String,
        pub function: ToolCallFunction,
    }

    fn default_call_type() -> String {
        "function".to_string()
    }

    /// One turn of the conversation
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub id: Uuid,
        pub role: Role,
        pub content: String,
        pub timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub thinking: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub tool_calls: Vec<ToolCall>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub code_artifacts: Vec<Artifact>,
    }

    impl ChatMessage {
        pub fn new(role: Role, content: impl Into<String>) -> Self {
            Self {
                id: Uuid::new_v4(),
                role,
                content: content.into(),
                timestamp: Utc::now(),
                thinking: None,
                tool_calls: Vec::new(),
                code_artifacts: Vec::new(),
            }
        }

        pub fn user(content: impl Into<String>) -> Self {
            Self::new(Role::User, content)
        }

        pub fn assistant(content: impl Into<String>) -> Self {
            Self::new(Role::Assistant, content)
        }

        pub fn system(content: impl Into<String>) -> Self {
            Self::new(Role::System, content)
        }

        pub fn with_thinking(mut self, thinking: Option<String>) -> Self {
            self.thinking = thinking;
            self
        }

        pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
            self.tool_calls = tool_calls;
            self
        }

        pub fn with_artifacts(mut self, artifacts: Vec<Artifact>) -> Self {
            self.code_artifacts = artifacts;
            self
        }
    }
}
