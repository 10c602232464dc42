/// Page shell and stylesheet compiled into the binary.
pub struct EmbeddedShell {
    pub page_html: &'static str,
    pub style_css: &'static str,
}

pub fn embedded_shell() -> EmbeddedShell {
    EmbeddedShell {
        page_html: include_str!("../../templates/dashboard.html"),
        style_css: include_str!("../../templates/style.css"),
    }
}
