use crate::retrieval::RetrievedDocument;

/// Only the top-ranked documents make it into the prompt.
pub const MAX_SOURCES: usize = 5;

pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;

/// Renders the first five documents as `[Source i]` blocks and cuts the
/// result to `max_chars` characters.
///
/// Blank documents are dropped but keep their position in the numbering,
/// so `[Source i]` always refers to the i-th retrieved page. The cut is a
/// plain character cut and may end mid-sentence.
pub fn build_context(docs: &[RetrievedDocument], max_chars: usize) -> String {
    let context = docs
        .iter()
        .take(MAX_SOURCES)
        .enumerate()
        .filter_map(|(i, doc)| {
            let text = doc.text.trim();
            (!text.is_empty()).then(|| format!("[Source {}]\n{}\n", i + 1, text))
        })
        .collect::<Vec<_>>()
        .join("\n");

    truncate_chars(context, max_chars)
}

fn truncate_chars(mut s: String, max_chars: usize) -> String {
    if let Some((byte_idx, _)) = s.char_indices().nth(max_chars) {
        s.truncate(byte_idx);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> RetrievedDocument {
        RetrievedDocument::new(text, None)
    }

    fn labels(context: &str) -> Vec<String> {
        context
            .lines()
            .filter(|l| l.starts_with("[Source "))
            .map(|l| l.trim_matches(|c| c == '[' || c == ']').to_string())
            .collect()
    }

    #[test]
    fn empty_input_gives_empty_context() {
        assert_eq!(build_context(&[], DEFAULT_MAX_CONTEXT_CHARS), "");
    }

    #[test]
    fn blocks_are_labelled_and_newline_joined() {
        let context = build_context(&[doc("  alpha "), doc("beta")], DEFAULT_MAX_CONTEXT_CHARS);
        assert_eq!(context, "[Source 1]\nalpha\n\n[Source 2]\nbeta\n");
    }

    #[test]
    fn skipped_documents_keep_their_numbering() {
        let docs = vec![doc("one"), doc("two"), doc("  \n\t"), doc("four"), doc("five")];
        let context = build_context(&docs, DEFAULT_MAX_CONTEXT_CHARS);
        assert_eq!(
            labels(&context),
            vec!["Source 1", "Source 2", "Source 4", "Source 5"]
        );
    }

    #[test]
    fn only_first_five_documents_are_used() {
        let docs: Vec<_> = (1..=8).map(|i| doc(&format!("page {i}"))).collect();
        let context = build_context(&docs, DEFAULT_MAX_CONTEXT_CHARS);
        assert_eq!(labels(&context).len(), 5);
        assert!(!context.contains("page 6"));
    }

    #[test]
    fn all_blank_documents_give_empty_context() {
        let docs = vec![doc(""), doc("   ")];
        assert_eq!(build_context(&docs, DEFAULT_MAX_CONTEXT_CHARS), "");
    }

    #[test]
    fn output_never_exceeds_budget() {
        let docs: Vec<_> = ["Ünïcödé ".repeat(400), "x".repeat(9000), "y".repeat(9000)]
            .iter()
            .map(|t| doc(t))
            .collect();
        for max_chars in [0, 1, 17, 500, 12_000, 50_000] {
            let context = build_context(&docs, max_chars);
            assert!(context.chars().count() <= max_chars);
        }
    }

    #[test]
    fn truncation_is_a_raw_character_cut() {
        let context = build_context(&[doc("héllo wörld")], 15);
        assert_eq!(context, "[Source 1]\nhéll");
    }
}
