//! Locating JSON inside free-form model output.
//!
//! Models wrap JSON in prose ("Here is the data: {...}") or in Markdown code
//! fences despite being told not to. These helpers only *find* the JSON text;
//! parsing stays with the caller so a provider with a strict JSON mode can
//! skip this module entirely.

use once_cell::sync::Lazy;
use regex::Regex;

/// Return the first balanced `{...}` object in `text`, if any.
///
/// Braces inside JSON string literals (including escaped quotes) do not
/// count towards the balance. An opening brace that is never closed yields
/// `None`.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

static RE_OPEN_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z]*\s*").expect("valid regex"));
static RE_CLOSE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").expect("valid regex"));

/// Strip a surrounding Markdown code fence (` ```json ... ``` `) and trim.
///
/// Text without fences is returned trimmed and otherwise untouched.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let without_open = RE_OPEN_FENCE.replace(trimmed, "");
    RE_CLOSE_FENCE.replace(&without_open, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_object_after_prose() {
        let text = r#"Here is the data: {"numeroNotaFiscal":"123"} hope it helps"#;
        assert_eq!(first_json_object(text), Some(r#"{"numeroNotaFiscal":"123"}"#));
    }

    #[test]
    fn nested_objects_are_kept_whole() {
        let text = r#"x {"a":{"b":{"c":1}},"d":[{"e":2}]} y"#;
        assert_eq!(first_json_object(text), Some(r#"{"a":{"b":{"c":1}},"d":[{"e":2}]}"#));
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let text = r#"{"descricao":"peça {tipo A} \"}\"","n":1} trailing }"#;
        assert_eq!(
            first_json_object(text),
            Some(r#"{"descricao":"peça {tipo A} \"}\"","n":1}"#)
        );
    }

    #[test]
    fn only_the_first_object_is_returned() {
        assert_eq!(first_json_object("{\"a\":1} and {\"b\":2}"), Some("{\"a\":1}"));
    }

    #[test]
    fn no_braces_yields_none() {
        assert_eq!(first_json_object("I could not read the invoice."), None);
        assert_eq!(first_json_object(""), None);
    }

    #[test]
    fn unbalanced_object_yields_none() {
        assert_eq!(first_json_object(r#"{"a": {"b": 1}"#), None);
    }

    #[test]
    fn strips_json_fence() {
        let text = "```json\n{\"calls\": []}\n```";
        assert_eq!(strip_code_fences(text), "{\"calls\": []}");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fences("```\n{}\n```\n"), "{}");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("  {\"calls\": []}  \n"), "{\"calls\": []}");
    }
}
