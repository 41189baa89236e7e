//! Preview assembly.
//!
//! Merges an artifact set into one self-contained HTML document:
//! - with an HTML artifact, referenced scripts and stylesheets are inlined
//!   into the first HTML document
//! - without one, a minimal page is synthesized around the css and js
//!
//! Also renders single artifacts into CSP-guarded sandbox documents.

use regex::{NoExpand, Regex};
use shared::artifact::{Artifact, ArtifactKind};
use tracing::{debug, warn};

const CSP_META: &str = r#"<meta http-equiv="Content-Security-Policy" content="default-src 'self'; script-src 'unsafe-inline' 'unsafe-eval'; style-src 'unsafe-inline'; img-src 'self' data: https:; connect-src 'none';">"#;

/// Assemble a single HTML document from the artifact set.
///
/// Deterministic in the input sequence. Never fails.
pub fn assemble_preview(artifacts: &[Artifact]) -> String {
    match artifacts.iter().find(|a| a.kind() == ArtifactKind::Html) {
        Some(base) => {
            debug!(base = base.filename(), "assembling preview around html artifact");
            inline_references(base.content(), artifacts)
        }
        None => {
            debug!(count = artifacts.len(), "assembling synthetic preview");
            synthesize_document(artifacts)
        }
    }
}

fn inline_references(base: &str, artifacts: &[Artifact]) -> String {
    let mut html = base.to_string();

    for artifact in artifacts {
        let (pattern, replacement) = match artifact.kind() {
            ArtifactKind::Js => (
                script_tag_pattern(artifact.filename()),
                format!("<script>{}</script>", artifact.content()),
            ),
            ArtifactKind::Css => (
                link_tag_pattern(artifact.filename()),
                format!("<style>{}</style>", artifact.content()),
            ),
            _ => continue,
        };

        match Regex::new(&pattern) {
            Ok(re) => {
                html = re
                    .replace_all(&html, NoExpand(replacement.as_str()))
                    .into_owned();
            }
            Err(e) => warn!("Cannot build reference pattern for {}: {}", artifact.filename(), e),
        }
    }

    html
}

/// `<script ... src="file" ...></script>`, tag names case-insensitive
fn script_tag_pattern(filename: &str) -> String {
    format!(
        r#"<(?i:script)\b[^>]*?\s(?i:src)\s*=\s*["']{}["'][^>]*>[\s\S]*?</(?i:script)\s*>"#,
        regex::escape(filename)
    )
}

/// `<link ... href="file" ...>`
fn link_tag_pattern(filename: &str) -> String {
    format!(
        r#"<(?i:link)\b[^>]*?\s(?i:href)\s*=\s*["']{}["'][^>]*>"#,
        regex::escape(filename)
    )
}

fn synthesize_document(artifacts: &[Artifact]) -> String {
    let styles: String = artifacts
        .iter()
        .filter(|a| a.kind() == ArtifactKind::Css)
        .map(|a| format!("<style>\n{}\n</style>\n", a.content()))
        .collect();

    let non_web: Vec<&Artifact> = artifacts.iter().filter(|a| !a.is_web_language()).collect();

    let (body, main_artifact) = if looks_like_canvas_game(artifacts) {
        (CANVAS_GAME_BODY.to_string(), None)
    } else if let [single] = non_web.as_slice() {
        (single.content().to_string(), Some(single.id()))
    } else {
        (file_listing(artifacts), None)
    };

    let scripts: String = artifacts
        .iter()
        .filter(|a| matches!(a.kind(), ArtifactKind::Js | ArtifactKind::Canvas))
        .filter(|a| Some(a.id()) != main_artifact)
        .map(|a| format!("<script>\n{}\n</script>\n", a.content()))
        .collect();

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>Preview</title>\n{styles}</head>\n<body>\n{body}\n{scripts}</body>\n</html>\n"
    )
}

const CANVAS_GAME_BODY: &str = r#"<div class="game-container" style="display:flex;justify-content:center;align-items:center;min-height:100vh;">
<canvas id="gameCanvas" width="400" height="400" style="border:1px solid #333;"></canvas>
</div>"#;

/// A game needs a canvas element to draw on even when no HTML was emitted.
fn looks_like_canvas_game(artifacts: &[Artifact]) -> bool {
    let mentions_game = artifacts.iter().any(|a| {
        let name = a.filename().to_lowercase();
        let content = a.content().to_lowercase();
        ["snake", "game"]
            .iter()
            .any(|w| name.contains(w) || content.contains(w))
    });
    mentions_game
        && artifacts
            .iter()
            .any(|a| a.content().to_lowercase().contains("canvas"))
}

fn file_listing(artifacts: &[Artifact]) -> String {
    let items: String = artifacts
        .iter()
        .map(|a| {
            format!(
                "<li><code>{}</code> ({})</li>\n",
                escape_html(a.filename()),
                escape_html(a.language())
            )
        })
        .collect();
    format!("<h1>Generated files</h1>\n<ul class=\"artifact-list\">\n{items}</ul>")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ── Single-artifact sandbox documents ───────────────────────────────

/// iframe `sandbox` permissions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SandboxOptions {
    pub allow_scripts: bool,
    pub allow_same_origin: bool,
    pub allow_forms: bool,
    pub allow_pointer_lock: bool,
    pub allow_popups: bool,
    pub allow_modals: bool,
    pub allow_orientation_lock: bool,
    pub allow_presentation: bool,
    pub allow_top_navigation: bool,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            allow_scripts: true,
            allow_same_origin: true,
            allow_forms: false,
            allow_pointer_lock: false,
            allow_popups: false,
            allow_modals: false,
            allow_orientation_lock: false,
            allow_presentation: false,
            allow_top_navigation: false,
        }
    }
}

impl SandboxOptions {
    /// Value for the iframe `sandbox` attribute
    pub fn attribute(&self) -> String {
        [
            (self.allow_scripts, "allow-scripts"),
            (self.allow_same_origin, "allow-same-origin"),
            (self.allow_forms, "allow-forms"),
            (self.allow_pointer_lock, "allow-pointer-lock"),
            (self.allow_popups, "allow-popups"),
            (self.allow_modals, "allow-modals"),
            (self.allow_orientation_lock, "allow-orientation-lock"),
            (self.allow_presentation, "allow-presentation"),
            (self.allow_top_navigation, "allow-top-navigation"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Wrap one artifact in a document suited to an isolated frame.
pub fn render_artifact(artifact: &Artifact) -> String {
    match artifact.kind() {
        ArtifactKind::Html => {
            let content = artifact.content();
            if content.contains("<head>") {
                content.replacen("<head>", &format!("<head>\n{CSP_META}"), 1)
            } else {
                content.replacen("<html>", &format!("<html>\n<head>{CSP_META}</head>"), 1)
            }
        }
        ArtifactKind::Js => format!(
            r#"<!DOCTYPE html>
<html>
<head>
{CSP_META}
<title>JavaScript Sandbox</title>
<style>
body {{ font-family: sans-serif; padding: 20px; }}
.output {{ background: #f5f5f5; border: 1px solid #ddd; border-radius: 4px; padding: 10px; margin-top: 20px; white-space: pre-wrap; font-family: monospace; }}
.error {{ color: red; }}
</style>
</head>
<body>
<h3>JavaScript output</h3>
<div id="output" class="output"></div>
<script>
const outputDiv = document.getElementById('output');
const originalConsole = console;
const format = (args) => args.map(a => typeof a === 'object' ? JSON.stringify(a, null, 2) : String(a)).join(' ');
console = {{
  log: (...args) => {{ outputDiv.textContent += format(args) + '\n'; originalConsole.log(...args); }},
  error: (...args) => {{ outputDiv.innerHTML += '<span class="error">' + format(args) + '</span>\n'; originalConsole.error(...args); }},
  warn: (...args) => {{ outputDiv.innerHTML += '<span style="color: orange">' + format(args) + '</span>\n'; originalConsole.warn(...args); }},
  info: (...args) => {{ outputDiv.innerHTML += '<span style="color: blue">' + format(args) + '</span>\n'; originalConsole.info(...args); }}
}};
window.onerror = function(message) {{ console.error('Error:', message); return true; }};
try {{
{content}
}} catch (error) {{
  console.error('Execution error:', error.message);
}}
</script>
</body>
</html>
"#,
            content = artifact.content()
        ),
        ArtifactKind::Css => format!(
            r##"<!DOCTYPE html>
<html>
<head>
{CSP_META}
<title>CSS Sandbox</title>
<style>
{content}
</style>
</head>
<body>
<div class="css-preview">
<h3>CSS preview</h3>
<div class="preview-content">
<h1>Heading 1</h1>
<h2>Heading 2</h2>
<p>Sample text with <a href="#">links</a>, <strong>bold text</strong> and <em>italic text</em>.</p>
<ul><li>Item 1</li><li>Item 2</li><li>Item 3</li></ul>
<button>Button</button>
<input type="text" placeholder="Input field" />
</div>
</div>
</body>
</html>
"##,
            content = artifact.content()
        ),
        ArtifactKind::Canvas => format!(
            r#"<!DOCTYPE html>
<html>
<head>
{CSP_META}
<title>Canvas Sandbox</title>
<style>
body {{ margin: 0; overflow: hidden; }}
canvas {{ display: block; }}
</style>
</head>
<body>
<canvas id="canvas" width="800" height="600"></canvas>
<script>
const canvas = document.getElementById('canvas');
const ctx = canvas.getContext('2d');
window.onerror = function(message) {{
  ctx.fillStyle = 'red';
  ctx.font = '16px sans-serif';
  ctx.fillText('Error: ' + message, 10, 50);
  return true;
}};
try {{
  function resizeCanvas() {{
    canvas.width = window.innerWidth;
    canvas.height = window.innerHeight;
  }}
  window.addEventListener('resize', resizeCanvas);
  resizeCanvas();
{content}
}} catch (error) {{
  ctx.fillStyle = 'red';
  ctx.font = '16px sans-serif';
  ctx.fillText('Execution error: ' + error.message, 10, 50);
}}
</script>
</body>
</html>
"#,
            content = artifact.content()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(name: &str, content: &str) -> Artifact {
        Artifact::from_language(name, "html", content)
    }
    fn css(name: &str, content: &str) -> Artifact {
        Artifact::from_language(name, "css", content)
    }
    fn js(name: &str, content: &str) -> Artifact {
        Artifact::from_language(name, "javascript", content)
    }

    #[test]
    fn test_three_file_project_is_inlined() {
        let artifacts = vec![
            html(
                "index.html",
                r#"<html><head><link rel="stylesheet" href="style.css"></head><body><h1>Hi</h1><script src="app.js"></script></body></html>"#,
            ),
            css("style.css", "h1 { color: red; }"),
            js("app.js", "console.log('ready');"),
        ];

        let out = assemble_preview(&artifacts);
        assert_eq!(
            out,
            "<html><head><style>h1 { color: red; }</style></head><body><h1>Hi</h1><script>console.log('ready');</script></body></html>"
        );
    }

    #[test]
    fn test_minimal_references_are_replaced() {
        let artifacts = vec![
            html(
                "index.html",
                r#"<html><head><link href="s.css"></head><body><script src="a.js"></script></body></html>"#,
            ),
            css("s.css", "body{color:red}"),
            js("a.js", "console.log(1)"),
        ];

        let out = assemble_preview(&artifacts);
        assert!(out.contains("<style>body{color:red}</style>"));
        assert!(out.contains("<script>console.log(1)</script>"));
        assert!(!out.contains("s.css"));
        assert!(!out.contains("a.js"));
    }

    #[test]
    fn test_inlining_handles_quotes_case_and_attributes() {
        let artifacts = vec![
            html(
                "index.html",
                "<HEAD><LINK HREF='css/main.css' rel='stylesheet' /></HEAD><SCRIPT type=\"module\" SRC='js/app.js' defer>\n</SCRIPT>",
            ),
            css("css/main.css", "body{}"),
            js("js/app.js", "run()"),
        ];

        let out = assemble_preview(&artifacts);
        assert_eq!(out, "<HEAD><style>body{}</style></HEAD><script>run()</script>");
    }

    #[test]
    fn test_unreferenced_artifacts_are_not_injected() {
        let base = "<html><body><script src=\"main.js\"></script></body></html>";
        let artifacts = vec![html("index.html", base), js("other.js", "x()"), css("extra.css", "p{}")];

        assert_eq!(assemble_preview(&artifacts), base);
    }

    #[test]
    fn test_filename_match_is_exact() {
        let base = r#"<script src="app.json"></script><script src="xapp.js"></script>"#;
        let artifacts = vec![html("index.html", base), js("app.js", "nope")];
        assert_eq!(assemble_preview(&artifacts), base);
    }

    #[test]
    fn test_regex_metacharacters_in_filename() {
        let artifacts = vec![
            html("index.html", r#"<script src="a+b(1).js"></script>"#),
            js("a+b(1).js", "ok()"),
        ];
        assert_eq!(assemble_preview(&artifacts), "<script>ok()</script>");
    }

    #[test]
    fn test_dollar_signs_in_content_are_literal() {
        let artifacts = vec![
            html("index.html", r#"<script src="app.js"></script>"#),
            js("app.js", "const $el = $('#x'); `${a}`"),
        ];
        assert_eq!(
            assemble_preview(&artifacts),
            "<script>const $el = $('#x'); `${a}`</script>"
        );
    }

    #[test]
    fn test_first_html_is_base() {
        let artifacts = vec![html("a.html", "<p>first</p>"), html("b.html", "<p>second</p>")];
        assert_eq!(assemble_preview(&artifacts), "<p>first</p>");
    }

    #[test]
    fn test_no_html_synthesizes_document() {
        let artifacts = vec![css("style.css", "body{margin:0}"), js("app.js", "start()")];
        let out = assemble_preview(&artifacts);

        assert!(out.starts_with("<!DOCTYPE html>"));
        let head_end = out.find("</head>").unwrap();
        assert!(out.find("body{margin:0}").unwrap() < head_end);
        assert!(out.find("<script>\nstart()\n</script>").unwrap() > head_end);
        assert!(out.contains("<code>style.css</code> (css)"));
        assert!(out.contains("<code>app.js</code> (javascript)"));
    }

    #[test]
    fn test_single_non_web_artifact_becomes_body() {
        let artifacts = vec![
            Artifact::from_language("README.md", "md", "# Title"),
            js("app.js", "go()"),
        ];
        let out = assemble_preview(&artifacts);

        assert!(out.contains("<body>\n# Title\n"));
        assert!(!out.contains("<script>\n# Title"));
        assert!(out.contains("<script>\ngo()\n</script>"));
    }

    #[test]
    fn test_two_non_web_artifacts_fall_back_to_listing() {
        let artifacts = vec![
            Artifact::from_language("package.json", "json", "{}"),
            Artifact::from_language("README.md", "md", "# Title"),
        ];
        let out = assemble_preview(&artifacts);
        assert!(out.contains("<code>package.json</code> (json)"));
        assert!(out.contains("<code>README.md</code> (md)"));
    }

    #[test]
    fn test_canvas_game_gets_canvas_element() {
        let artifacts = vec![js(
            "snake.js",
            "const canvas = document.getElementById('gameCanvas');",
        )];
        let out = assemble_preview(&artifacts);
        assert!(out.contains(r#"<canvas id="gameCanvas""#));
        assert!(out.contains("getElementById('gameCanvas')"));
    }

    #[test]
    fn test_lone_canvas_artifact_runs_as_script() {
        let artifacts = vec![Artifact::from_language(
            "draw.js",
            "canvas",
            "const c = document.querySelector('canvas'); c.getContext('2d');",
        )];
        let out = assemble_preview(&artifacts);

        assert!(out.contains("<script>\nconst c = document.querySelector('canvas');"));
        assert!(!out.contains("<body>\nconst c"));
        assert!(out.contains("<code>draw.js</code>"));
    }

    #[test]
    fn test_game_without_canvas_is_listing() {
        let artifacts = vec![js("game.js", "console.log('text adventure')")];
        let out = assemble_preview(&artifacts);
        assert!(!out.contains("<canvas"));
        assert!(out.contains("<code>game.js</code>"));
    }

    #[test]
    fn test_listing_escapes_names() {
        let artifacts = vec![css("<odd>.css", "p{}")];
        let out = assemble_preview(&artifacts);
        assert!(out.contains("&lt;odd&gt;.css"));
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let artifacts = vec![
            html("index.html", r#"<link href="s.css"><script src="a.js"></script>"#),
            css("s.css", "a{}"),
            js("a.js", "b()"),
        ];
        assert_eq!(assemble_preview(&artifacts), assemble_preview(&artifacts));

        let synthetic = vec![css("s.css", "a{}"), js("a.js", "b()")];
        assert_eq!(assemble_preview(&synthetic), assemble_preview(&synthetic));
    }

    #[test]
    fn test_empty_set_is_valid_document() {
        let out = assemble_preview(&[]);
        assert!(out.contains("<body>"));
        assert!(out.contains("</html>"));
    }

    #[test]
    fn test_render_html_adds_csp() {
        let with_head = html("i.html", "<html><head><title>x</title></head></html>");
        let out = render_artifact(&with_head);
        assert!(out.starts_with("<html><head>\n<meta http-equiv=\"Content-Security-Policy\""));

        let without_head = html("i.html", "<html><body></body></html>");
        let out = render_artifact(&without_head);
        assert!(out.contains("<html>\n<head><meta http-equiv"));
    }

    #[test]
    fn test_render_other_kinds() {
        let out = render_artifact(&js("a.js", "console.log(1)"));
        assert!(out.contains("JavaScript Sandbox"));
        assert!(out.contains("console.log(1)"));

        let out = render_artifact(&css("a.css", "h1{color:red}"));
        assert!(out.contains("<style>\nh1{color:red}\n</style>"));

        let out = render_artifact(&Artifact::from_language("d.js", "canvas", "ctx.fill()"));
        assert!(out.contains(r#"<canvas id="canvas""#));
        assert!(out.contains("ctx.fill()"));
        assert!(out.contains("Content-Security-Policy"));
    }

    #[test]
    fn test_sandbox_attribute() {
        assert_eq!(SandboxOptions::default().attribute(), "allow-scripts allow-same-origin");

        let options = SandboxOptions {
            allow_same_origin: false,
            allow_forms: true,
            allow_modals: true,
            ..SandboxOptions::default()
        };
        assert_eq!(options.attribute(), "allow-scripts allow-forms allow-modals");
    }
}
