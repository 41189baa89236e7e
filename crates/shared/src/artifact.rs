//! Generated code artifacts.
//!
//! An artifact is one file the model produced through the
//! `create_code_artifact` tool. The kind is a coarse rendering bucket used by
//! the preview assembler; the language is only a display label.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse rendering category of an artifact
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Html,
    Css,
    Js,
    Canvas,
}

impl ArtifactKind {
    /// Map a declared language (or file extension) onto a kind.
    ///
    /// Anything outside the web languages, including json, markdown and
    /// yaml, lands in the `Js` bucket.
    pub fn from_language(language: &str) -> Self {
        match language.trim().to_lowercase().as_str() {
            "html" | "htm" => ArtifactKind::Html,
            "css" | "scss" | "sass" | "less" => ArtifactKind::Css,
            "js" | "jsx" | "ts" | "tsx" | "javascript" | "typescript" => ArtifactKind::Js,
            "canvas" => ArtifactKind::Canvas,
            _ => ArtifactKind::Js,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Html => "html",
            ArtifactKind::Css => "css",
            ArtifactKind::Js => "js",
            ArtifactKind::Canvas => "canvas",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Languages that the browser renders natively (markup, styles, scripts).
const WEB_LANGUAGES: &[&str] = &[
    "html",
    "htm",
    "css",
    "scss",
    "sass",
    "less",
    "js",
    "jsx",
    "ts",
    "tsx",
    "javascript",
    "typescript",
    "canvas",
];

/// One generated file. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    id: Uuid,
    kind: ArtifactKind,
    filename: String,
    language: String,
    content: String,
}

impl Artifact {
    /// Create an artifact with a fresh id
    pub fn new(
        kind: ArtifactKind,
        filename: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            filename: filename.into(),
            language: language.into(),
            content: content.into(),
        }
    }

    /// Create an artifact whose kind is derived from its language
    pub fn from_language(
        filename: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let language = language.into();
        Self::new(
            ArtifactKind::from_language(&language),
            filename,
            language,
            content,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// True when the language label is something a browser renders directly
    pub fn is_web_language(&self) -> bool {
        let lang = self.language.trim().to_lowercase();
        WEB_LANGUAGES.contains(&lang.as_str())
    }

    /// Copy into another collection under a new id
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }
}
