//! Optional desktop-shell integration.
//!
//! A headless or browser build has no shell; every call then degrades to a
//! no-op instead of failing.

use shared::settings::Theme;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Operations a desktop shell offers to the chat client
pub trait HostShell: Send + Sync {
    fn platform(&self) -> &str;
    fn minimize(&self);
    fn maximize(&self);
    fn close(&self);
    /// 0.0 (invisible) to 1.0 (opaque)
    fn set_window_opacity(&self, opacity: f32);
    fn open_file(&self) -> Option<PathBuf>;
    fn save_file(&self, data: &str) -> Option<PathBuf>;
    fn notify(&self, title: &str, body: &str);
    fn system_theme(&self) -> Option<Theme>;
}

/// Guarded access to an optional [`HostShell`]
#[derive(Clone, Default)]
pub struct HostCapabilities {
    shell: Option<Arc<dyn HostShell>>,
}

impl HostCapabilities {
    pub fn new(shell: Arc<dyn HostShell>) -> Self {
        Self { shell: Some(shell) }
    }

    pub fn headless() -> Self {
        Self::default()
    }

    pub fn is_desktop(&self) -> bool {
        self.shell.is_some()
    }

    pub fn platform(&self) -> Option<String> {
        self.shell.as_ref().map(|s| s.platform().to_string())
    }

    pub fn minimize(&self) -> bool {
        self.with_shell("minimize", |s| s.minimize())
    }

    pub fn maximize(&self) -> bool {
        self.with_shell("maximize", |s| s.maximize())
    }

    pub fn close(&self) -> bool {
        self.with_shell("close", |s| s.close())
    }

    /// Apply a 0-100 transparency setting as window opacity
    pub fn apply_window_transparency(&self, transparency: u8) -> bool {
        let opacity = transparency_to_opacity(transparency);
        self.with_shell("set_window_opacity", |s| s.set_window_opacity(opacity))
    }

    pub fn open_file(&self) -> Option<PathBuf> {
        self.shell.as_ref().and_then(|s| s.open_file())
    }

    pub fn save_file(&self, data: &str) -> Option<PathBuf> {
        self.shell.as_ref().and_then(|s| s.save_file(data))
    }

    pub fn notify(&self, title: &str, body: &str) -> bool {
        self.with_shell("notify", |s| s.notify(title, body))
    }

    pub fn system_theme(&self) -> Option<Theme> {
        self.shell.as_ref().and_then(|s| s.system_theme())
    }

    fn with_shell(&self, op: &str, f: impl FnOnce(&dyn HostShell)) -> bool {
        match &self.shell {
            Some(shell) => {
                f(shell.as_ref());
                true
            }
            None => {
                debug!(op, "no host shell, skipping");
                false
            }
        }
    }
}

pub fn transparency_to_opacity(transparency: u8) -> f32 {
    f32::from(transparency.min(100)) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeShell {
        calls: Mutex<Vec<String>>,
    }

    impl HostShell for FakeShell {
        fn platform(&self) -> &str {
            "linux"
        }
        fn minimize(&self) {
            self.calls.lock().push("minimize".into());
        }
        fn maximize(&self) {
            self.calls.lock().push("maximize".into());
        }
        fn close(&self) {
            self.calls.lock().push("close".into());
        }
        fn set_window_opacity(&self, opacity: f32) {
            self.calls.lock().push(format!("opacity {:.2}", opacity));
        }
        fn open_file(&self) -> Option<PathBuf> {
            Some(PathBuf::from("/tmp/picked.html"))
        }
        fn save_file(&self, _data: &str) -> Option<PathBuf> {
            None
        }
        fn notify(&self, title: &str, _body: &str) {
            self.calls.lock().push(format!("notify {}", title));
        }
        fn system_theme(&self) -> Option<Theme> {
            Some(Theme::Dark)
        }
    }

    #[test]
    fn test_headless_degrades_to_noop() {
        let host = HostCapabilities::headless();
        assert!(!host.is_desktop());
        assert!(!host.minimize());
        assert!(!host.apply_window_transparency(50));
        assert!(!host.notify("t", "b"));
        assert_eq!(host.open_file(), None);
        assert_eq!(host.system_theme(), None);
        assert_eq!(host.platform(), None);
    }

    #[test]
    fn test_calls_reach_shell() {
        let shell = Arc::new(FakeShell::default());
        let host = HostCapabilities::new(shell.clone());

        assert!(host.maximize());
        assert!(host.apply_window_transparency(90));
        assert!(host.notify("Done", "Preview ready"));
        assert_eq!(host.open_file(), Some(PathBuf::from("/tmp/picked.html")));
        assert_eq!(host.system_theme(), Some(Theme::Dark));
        assert_eq!(
            shell.calls.lock().as_slice(),
            ["maximize", "opacity 0.90", "notify Done"]
        );
    }

    #[test]
    fn test_transparency_mapping() {
        assert_eq!(transparency_to_opacity(0), 0.0);
        assert_eq!(transparency_to_opacity(100), 1.0);
        assert_eq!(transparency_to_opacity(250), 1.0);
        assert!((transparency_to_opacity(89) - 0.89).abs() < f32::EPSILON);
    }
}
