//! Persona prompt template.
//!
//! Placeholders: `{bot_name}`, `{primary}`, `{question}`, `{context}`.
//! `{question}` and `{context}` are mandatory. The context list is rendered as
//! a JSON array of strings. Substitution is single-pass, so braces inside the
//! question or the context are never re-expanded.

use std::path::Path;

use tracing::info;

use crate::error::BootstrapError;
use crate::persona::Persona;

/// Default instructions for impersonating the persona.
pub const DEFAULT_TEMPLATE: &str = "You are {bot_name} in the conversation below and I am {primary}.
You have to reply to my messages.

Steps:
- Understand the message from {primary}.
- Use the chat history to answer it.
- Think step by step about how {bot_name} would answer.
- If the chat history already contains a fitting answer, reuse it.
- Otherwise, come up with a reply that sounds like the chat history.
Note:
- The chat may mix languages or scripts (including transliterated text). Reply in the same style wherever needed.

{primary}: {question}
Chat History: {context}
{bot_name}:";

const REQUIRED: [&str; 2] = ["question", "context"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersonaPrompt {
    template: String,
}

impl Default for PersonaPrompt {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PersonaPrompt {
    /// # Errors
    /// [`BootstrapError::Template`] if `{question}` or `{context}` is missing.
    pub fn new(template: impl Into<String>) -> Result<Self, BootstrapError> {
        let template = template.into();
        for name in REQUIRED {
            if !template.contains(&format!("{{{name}}}")) {
                return Err(BootstrapError::Template(format!(
                    "template lacks the `{{{name}}}` placeholder"
                )));
            }
        }
        Ok(Self { template })
    }

    /// Loads a template from a UTF-8 file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BootstrapError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BootstrapError::Template(format!("cannot read {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), "custom prompt template loaded");
        Self::new(raw)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Renders the prompt for one chat cycle.
    pub fn render(&self, persona: &Persona, question: &str, context: &[String]) -> String {
        let context_json = serde_json::to_string(context).unwrap_or_else(|_| "[]".to_string());

        let mut out = String::with_capacity(self.template.len() + question.len() + context_json.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let value = after.find('}').and_then(|close| {
                let v = match &after[..close] {
                    "bot_name" => persona.bot_name.as_str(),
                    "primary" => persona.primary.as_str(),
                    "question" => question,
                    "context" => context_json.as_str(),
                    _ => return None,
                };
                Some((v, close))
            });
            match value {
                Some((v, close)) => {
                    out.push_str(v);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona() -> Persona {
        Persona {
            bot_name: "Ravi".into(),
            primary: "Me".into(),
        }
    }

    #[test]
    fn default_template_renders_all_slots() {
        let p = PersonaPrompt::default();
        let out = p.render(&persona(), "whatcha doing?", &["a\nb".into(), "c".into()]);
        assert!(out.starts_with("You are Ravi in the conversation below and I am Me."));
        assert!(out.contains("Me: whatcha doing?"));
        assert!(out.contains(r#"Chat History: ["a\nb","c"]"#));
        assert!(out.ends_with("Ravi:"));
        assert!(!out.contains("{question}"));
    }

    #[test]
    fn placeholders_in_values_are_not_expanded() {
        let p = PersonaPrompt::new("Q={question} C={context} {unknown}").unwrap();
        let out = p.render(&persona(), "what is {context}?", &[]);
        assert_eq!(out, "Q=what is {context}? C=[] {unknown}");
    }

    #[test]
    fn unbalanced_braces_are_kept() {
        let p = PersonaPrompt::new("{question} {context} {oops").unwrap();
        assert_eq!(p.render(&persona(), "q", &[]), "q [] {oops");
    }

    #[test]
    fn required_placeholders_are_enforced() {
        assert!(matches!(
            PersonaPrompt::new("hello {question}"),
            Err(BootstrapError::Template(_))
        ));
        assert!(PersonaPrompt::new("{context}{question}").is_ok());
    }

    #[test]
    fn loads_template_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "As {bot_name}: {question} / {context}").unwrap();
        let p = PersonaPrompt::from_file(&path).unwrap();
        assert_eq!(p.render(&persona(), "hi", &["x".into()]), r#"As Ravi: hi / ["x"]"#);

        assert!(PersonaPrompt::from_file(dir.path().join("missing.txt")).is_err());
    }
}
