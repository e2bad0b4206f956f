use std::path::Path;

/// One way of turning an on-screen display call into "save, then display".
pub trait OutputRedirect: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, code: &str) -> bool;

    /// How to satisfy this strategy, phrased for a repair prompt.
    fn hint(&self) -> String {
        self.name().to_string()
    }

    /// Must be idempotent: injecting into already-injected code is a no-op.
    fn inject(&self, code: &str, image_path: &Path) -> String;
}

/// Inserts a save call on its own line before every line that calls `marker`.
pub struct ShowCallRedirect {
    name: &'static str,
    marker: &'static str,
    save_call: fn(&str) -> String,
}

impl ShowCallRedirect {
    /// `save_call` receives the image path already quoted as a Python string literal.
    pub fn new(name: &'static str, marker: &'static str, save_call: fn(&str) -> String) -> Self {
        Self { name, marker, save_call }
    }

    pub fn matplotlib() -> Self {
        Self::new("matplotlib", "plt.show()", |path| {
            format!("plt.savefig({path}, dpi=300, bbox_inches=\"tight\")")
        })
    }

    pub fn plotly() -> Self {
        Self::new("plotly", "fig.show()", |path| format!("fig.write_image({path})"))
    }

    fn is_call_line(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        !trimmed.starts_with('#') && trimmed.contains(self.marker)
    }
}

impl OutputRedirect for ShowCallRedirect {
    fn name(&self) -> &'static str {
        self.name
    }

    fn detect(&self, code: &str) -> bool {
        code.split('\n').any(|line| self.is_call_line(line))
    }

    fn hint(&self) -> String {
        format!("{} ({})", self.marker, self.name)
    }

    fn inject(&self, code: &str, image_path: &Path) -> String {
        let save = (self.save_call)(&python_string(image_path));
        let mut out: Vec<String> = Vec::new();
        for line in code.split('\n') {
            // The save call itself may mention the marker through the image path.
            if line.trim() != save && self.is_call_line(line) {
                let already_saved = out.last().is_some_and(|prev| prev.trim() == save);
                if !already_saved {
                    let indent = &line[..line.len() - line.trim_start().len()];
                    out.push(format!("{indent}{save}"));
                }
            }
            out.push(line.to_string());
        }
        out.join("\n")
    }
}

/// Double-quoted Python literal for a filesystem path.
pub fn python_string(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut lit = String::with_capacity(raw.len() + 2);
    lit.push('"');
    for c in raw.chars() {
        match c {
            '\\' => lit.push_str("\\\\"),
            '"' => lit.push_str("\\\""),
            '\n' => lit.push_str("\\n"),
            _ => lit.push(c),
        }
    }
    lit.push('"');
    lit
}
