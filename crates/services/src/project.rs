//! Project structure derived from an artifact set.

use serde::Serialize;
use serde_json::json;
use shared::artifact::Artifact;

const PROJECT_NAME: &str = "isolated-project";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    React,
    Vue,
    Angular,
    Vanilla,
}

impl Framework {
    /// React wins over Vue, Vue over Angular
    pub fn detect(artifacts: &[Artifact]) -> Self {
        let any = |needle: &str| artifacts.iter().any(|a| a.filename().contains(needle));
        if any(".jsx") || any(".tsx") {
            Framework::React
        } else if any(".vue") {
            Framework::Vue
        } else if any(".component.ts") {
            Framework::Angular
        } else {
            Framework::Vanilla
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::React => "react",
            Framework::Vue => "vue",
            Framework::Angular => "angular",
            Framework::Vanilla => "vanilla",
        }
    }

    pub fn dependencies(&self) -> &'static [&'static str] {
        match self {
            Framework::React => &["react", "react-dom"],
            Framework::Vue => &["vue"],
            Framework::Angular => &["@angular/core", "@angular/common"],
            Framework::Vanilla => &[],
        }
    }
}

/// Node of the project tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectFile {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ProjectFile>,
    pub is_directory: bool,
}

impl ProjectFile {
    fn file(name: &str, path: String, content: String) -> Self {
        Self {
            name: name.to_string(),
            path,
            content,
            children: Vec::new(),
            is_directory: false,
        }
    }

    fn dir(name: &str, path: &str, children: Vec<ProjectFile>) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            content: String::new(),
            children,
            is_directory: true,
        }
    }

    /// Depth-first lookup by path
    pub fn find(&self, path: &str) -> Option<&ProjectFile> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(path))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStructure {
    pub name: String,
    pub framework: Framework,
    pub dependencies: Vec<String>,
    pub root: ProjectFile,
}

impl ProjectStructure {
    pub fn from_artifacts(artifacts: &[Artifact]) -> Self {
        let framework = Framework::detect(artifacts);

        let sources = artifacts
            .iter()
            .map(|a| {
                ProjectFile::file(
                    a.filename(),
                    format!("/src/{}", a.filename()),
                    a.content().to_string(),
                )
            })
            .collect();

        let root = ProjectFile::dir(
            "root",
            "/",
            vec![
                ProjectFile::dir("src", "/src", sources),
                ProjectFile::dir(
                    "public",
                    "/public",
                    vec![ProjectFile::file(
                        "index.html",
                        "/public/index.html".into(),
                        index_html(framework),
                    )],
                ),
                ProjectFile::file("package.json", "/package.json".into(), package_json(framework)),
                ProjectFile::file("README.md", "/README.md".into(), readme(framework)),
            ],
        );

        Self {
            name: PROJECT_NAME.to_string(),
            framework,
            dependencies: framework.dependencies().iter().map(|d| d.to_string()).collect(),
            root,
        }
    }
}

fn index_html(framework: Framework) -> String {
    let (title, head_extra, body) = match framework {
        Framework::React => (
            "React App",
            "",
            "<div id=\"root\"></div>\n    <script type=\"module\" src=\"/src/main.jsx\"></script>",
        ),
        Framework::Vue => (
            "Vue App",
            "",
            "<div id=\"app\"></div>\n    <script type=\"module\" src=\"/src/main.js\"></script>",
        ),
        Framework::Angular => ("Angular App", "\n    <base href=\"/\">", "<app-root></app-root>"),
        Framework::Vanilla => (
            "Web App",
            "\n    <link rel=\"stylesheet\" href=\"/src/style.css\">",
            "<div id=\"app\"></div>\n    <script src=\"/src/main.js\"></script>",
        ),
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n  <head>\n    <meta charset=\"UTF-8\" />\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\" />\n    \
         <title>{title}</title>{head_extra}\n  </head>\n  <body>\n    {body}\n  </body>\n</html>"
    )
}

fn package_json(framework: Framework) -> String {
    let dependencies: serde_json::Map<String, serde_json::Value> = framework
        .dependencies()
        .iter()
        .map(|d| (d.to_string(), json!("^latest")))
        .collect();
    let manifest = json!({
        "name": PROJECT_NAME,
        "version": "0.1.0",
        "private": true,
        "type": "module",
        "scripts": {
            "dev": "vite",
            "build": "vite build",
            "preview": "vite preview"
        },
        "dependencies": dependencies,
        "devDependencies": { "vite": "^latest" }
    });
    serde_json::to_string_pretty(&manifest).unwrap_or_default()
}

fn readme(framework: Framework) -> String {
    let flavour = match framework {
        Framework::Vanilla => "vanilla JavaScript",
        other => other.as_str(),
    };
    format!(
        "# Isolated Project\n\nAn automatically generated project using {flavour}.\n\n\
         ## Running\n\n```bash\nnpm install\nnpm run dev\n```\n\n\
         ## Layout\n\n- `/src`: application sources\n- `/public`: static assets\n\
         - `package.json`: dependencies and scripts\n"
    )
}
