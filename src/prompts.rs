//! Prompt template loading and placeholder substitution.
//!
//! Two templates live in the prompt directory: one for creating an applet
//! from a description alone, one for changing an existing applet with the
//! current HTML and localStorage as context. Placeholders are literal
//! `{description}`, `{current_html}` and `{current_local_storage}` tokens.
//! A missing template file is fatal at startup; there is no fallback text.

use std::io;
use std::path::Path;

const INITIAL_TEMPLATE_FILE: &str = "initial_app.prompt";
const CHANGE_TEMPLATE_FILE: &str = "change_app.prompt";

#[derive(Debug, Clone)]
pub struct PromptTemplates {
    initial: String,
    change: String,
}

impl PromptTemplates {
    /// Read both template files from `dir`.
    pub fn load(dir: &Path) -> io::Result<Self> {
        let initial = std::fs::read_to_string(dir.join(INITIAL_TEMPLATE_FILE))?;
        let change = std::fs::read_to_string(dir.join(CHANGE_TEMPLATE_FILE))?;
        Ok(Self { initial, change })
    }

    /// Build templates from in-memory text. Used by tests; `load` is the
    /// production path.
    pub fn from_parts(initial: String, change: String) -> Self {
        Self { initial, change }
    }

    /// Format the "create" prompt from the transcription alone.
    pub fn format_initial(&self, description: &str) -> String {
        self.initial.replace("{description}", description)
    }

    /// Format the "change" prompt. `storage_json` is the current storage
    /// already serialized to its JSON text form.
    pub fn format_change(&self, description: &str, current_html: &str, storage_json: &str) -> String {
        self.change
            .replace("{description}", description)
            .replace("{current_html}", current_html)
            .replace("{current_local_storage}", storage_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_format_initial() {
        let templates =
            PromptTemplates::from_parts("Build this: {description}".into(), String::new());
        assert_eq!(
            templates.format_initial("a todo list"),
            "Build this: a todo list"
        );
    }

    #[test]
    fn test_format_change_substitutes_all_placeholders() {
        let templates = PromptTemplates::from_parts(
            String::new(),
            "Request: {description}\nHTML: {current_html}\nStorage: {current_local_storage}".into(),
        );
        let prompt = templates.format_change("make it blue", "<html></html>", "{\"a\":1}");
        assert!(prompt.contains("Request: make it blue"));
        assert!(prompt.contains("HTML: <html></html>"));
        assert!(prompt.contains("Storage: {\"a\":1}"));
    }

    #[test]
    fn test_load_missing_template_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PromptTemplates::load(dir.path()).is_err());
    }

    #[test]
    fn test_load_reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("initial_app.prompt"), "i {description}").unwrap();
        fs::write(dir.path().join("change_app.prompt"), "c {description}").unwrap();
        let templates = PromptTemplates::load(dir.path()).unwrap();
        assert_eq!(templates.format_initial("x"), "i x");
    }
}
