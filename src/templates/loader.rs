use anyhow::{Context, Result};
use std::path::Path;

use super::embedded::embedded_shell;

const PAGE_FILE: &str = "dashboard.html";
const STYLE_FILE: &str = "style.css";

/// HTML page shell with `{{name}}` placeholders, plus its stylesheet.
#[derive(Clone, Debug)]
pub struct Shell {
    pub page_html: String,
    pub style_css: String,
}

impl Shell {
    pub fn embedded() -> Self {
        let shell = embedded_shell();
        Self {
            page_html: shell.page_html.to_string(),
            style_css: shell.style_css.to_string(),
        }
    }

    /// Load overrides from `dir`. Files that are absent there fall back to
    /// the embedded copies.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut shell = Self::embedded();
        let Some(dir) = dir else {
            return Ok(shell);
        };

        if !dir.is_dir() {
            anyhow::bail!("Template directory not found: {}", dir.display());
        }

        let page_path = dir.join(PAGE_FILE);
        if page_path.exists() {
            shell.page_html = std::fs::read_to_string(&page_path)
                .with_context(|| format!("Failed to read page template: {}", page_path.display()))?;
            log::info!("Using page template {}", page_path.display());
        }

        let style_path = dir.join(STYLE_FILE);
        if style_path.exists() {
            shell.style_css = std::fs::read_to_string(&style_path)
                .with_context(|| format!("Failed to read stylesheet: {}", style_path.display()))?;
            log::info!("Using stylesheet {}", style_path.display());
        }

        Ok(shell)
    }

    /// Fill the page shell. `{{style}}` is always bound to the stylesheet.
    pub fn fill(&self, vars: &[(&str, &str)]) -> String {
        let mut all: Vec<(&str, &str)> = Vec::with_capacity(vars.len() + 1);
        all.push(("style", self.style_css.as_str()));
        all.extend_from_slice(vars);
        fill_placeholders(&self.page_html, &all)
    }
}

/// Single-pass `{{name}}` substitution. Substituted text is never rescanned,
/// so values may safely contain braces. Unknown names are left in place.
pub fn fill_placeholders(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = after[..end].trim();
        match vars.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => {
                log::warn!("Unknown template placeholder '{{{{{}}}}}'", name);
                out.push_str(&rest[start..start + 2 + end + 2]);
            }
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_known_placeholders_once() {
        let out = fill_placeholders(
            "<h1>{{title}}</h1>{{ body }}",
            &[("title", "{{body}}"), ("body", "<p>x</p>")],
        );
        assert_eq!(out, "<h1>{{body}}</h1><p>x</p>");
    }

    #[test]
    fn leaves_unknown_and_unterminated_placeholders() {
        assert_eq!(fill_placeholders("a {{nope}} b", &[]), "a {{nope}} b");
        assert_eq!(fill_placeholders("a {{open", &[("open", "x")]), "a {{open");
    }

    #[test]
    fn embedded_shell_has_every_slot() {
        let shell = Shell::embedded();
        for slot in ["{{title}}", "{{style}}", "{{plotly_src}}", "{{sidebar}}", "{{content}}", "{{scripts}}"] {
            assert!(shell.page_html.contains(slot), "missing {slot}");
        }
    }

    #[test]
    fn directory_overrides_replace_only_present_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STYLE_FILE), "body { color: red; }").unwrap();

        let shell = Shell::load(Some(dir.path())).unwrap();
        assert_eq!(shell.style_css, "body { color: red; }");
        assert_eq!(shell.page_html, Shell::embedded().page_html);
        assert!(shell.fill(&[]).contains("color: red"));

        assert!(Shell::load(Some(&dir.path().join("missing"))).is_err());
    }
}
