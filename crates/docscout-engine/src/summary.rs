use docscout_core::error::Error;
use docscout_core::traits::Generator;
use docscout_core::types::RetrievalHit;

/// Instruction sent to the generator. `{query}`, `{count}` and `{context}`
/// are substituted before the call.
pub const SUMMARY_TEMPLATE: &str = "You are helping a user find documents on their own computer.\n\
Answer in two or three sentences, using only the snippets below. \
If they do not answer the question, say which documents look most related.\n\n\
Question: {query}\n\
Snippets ({count}):\n{context}";

pub fn default_summary(count: usize) -> String {
    format!("Found {count} relevant document snippets for your query.")
}

pub fn build_prompt(query: &str, hits: &[RetrievalHit]) -> String {
    let context = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let page = hit.fragment.page_number.map_or_else(|| "-".to_string(), |p| p.to_string());
            format!("[{}] {} (page {})\n{}\n", i + 1, hit.fragment.source_path, page, hit.fragment.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n");
    render(SUMMARY_TEMPLATE, &[("query", query), ("count", &hits.len().to_string()), ("context", &context)])
}

/// Single-pass placeholder substitution. Substituted values are never
/// rescanned, so braces in the query or in document text arrive verbatim.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let value = tail
            .find('}')
            .and_then(|close| values.iter().find(|(key, _)| *key == &tail[..close]).map(|(_, v)| (close, *v)));
        match value {
            Some((close, v)) => {
                out.push_str(v);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Summary line for `hits`. A generator failure degrades to an explanatory
/// message; it never discards the hits.
pub fn summarize(generator: Option<&dyn Generator>, query: &str, hits: &[RetrievalHit]) -> String {
    let Some(generator) = generator else {
        return default_summary(hits.len());
    };
    match generator.generate(&build_prompt(query, hits)) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            let err = Error::Generation(e);
            tracing::warn!(error = %err, "summary generation failed");
            format!("Summary unavailable: {err}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscout_core::types::DocumentFragment;

    struct Echo;
    impl Generator for Echo {
        fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            Ok(format!("  {} chars  ", prompt.len()))
        }
    }

    struct Broken;
    impl Generator for Broken {
        fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    fn hits() -> Vec<RetrievalHit> {
        vec![RetrievalHit {
            fragment: DocumentFragment {
                text: "Invoice 2023, amount due 420 EUR\n".into(),
                source_path: "/docs/invoice_2023.pdf".into(),
                page_number: Some(2),
                start: 0,
            },
            distance: 0.2,
        }]
    }

    #[test]
    fn prompt_carries_query_count_and_context() {
        let prompt = build_prompt("when is the invoice due", &hits());
        assert!(prompt.contains("Question: when is the invoice due"));
        assert!(prompt.contains("Snippets (1):"));
        assert!(prompt.contains("[1] /docs/invoice_2023.pdf (page 2)\nInvoice 2023, amount due 420 EUR"));
        assert!(!prompt.contains("{context}"));
    }

    #[test]
    fn braces_in_query_and_text_are_not_substituted() {
        let mut hits = hits();
        hits[0].fragment.text = "template uses {query} here".into();
        let query = "what does {context} mean, and {count}?";
        let prompt = build_prompt(query, &hits);
        assert!(prompt.contains("Question: what does {context} mean, and {count}?\n"), "{prompt}");
        assert!(prompt.contains("Snippets (1):"));
        assert!(prompt.contains("template uses {query} here"));
        assert_eq!(prompt.matches("Invoice").count(), 0);
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        assert_eq!(render("a {x} {y", &[("y", "1")]), "a {x} {y");
        assert_eq!(render("{y}{y}", &[("y", "1")]), "11");
    }

    #[test]
    fn without_generator_uses_default_line() {
        assert_eq!(summarize(None, "q", &hits()), "Found 1 relevant document snippets for your query.");
    }

    #[test]
    fn generator_output_is_trimmed() {
        let out = summarize(Some(&Echo), "q", &hits());
        assert!(out.ends_with("chars"));
        assert!(!out.starts_with(' '));
    }

    #[test]
    fn generator_failure_is_reported_in_summary() {
        let out = summarize(Some(&Broken), "q", &hits());
        assert!(out.starts_with("Summary unavailable:"));
        assert!(out.contains("connection refused"));
    }
}
