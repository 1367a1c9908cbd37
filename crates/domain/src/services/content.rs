//! Pure text composition: item rendering, prompts and the posted comment

use crate::entities::{Item, ItemSummaries, RetrievalMatch};

/// Longest excerpt of a past case included in the advice context
pub const CONTEXT_EXCERPT_CHARS: usize = 500;

const NO_CONTEXT: &str = "No related past cases were found.";

/// Plain-text rendering used for indexing and summarization
pub fn render_item(item: &Item) -> String {
    let mut lines = vec![
        format!("Subject: {}", item.subject),
        format!("Description: {}", item.description),
        format!("Status: {}", item.status),
        format!("Priority: {}", item.priority),
        format!("Tracker: {}", item.tracker),
    ];
    lines.extend(
        item.journals
            .iter()
            .filter_map(|journal| journal.text())
            .map(|notes| format!("Comment: {notes}")),
    );
    lines.join("\n")
}

/// Discussion transcript without AI-authored notes; `None` if nothing remains
pub fn render_discussion(item: &Item, signature: &str) -> Option<String> {
    let notes: Vec<String> = item
        .journals
        .iter()
        .filter_map(|journal| {
            let text = journal.text()?;
            if text.contains(signature) {
                return None;
            }
            let author = journal.author.as_deref().unwrap_or("Unknown");
            Some(format!("[{author}] {text}"))
        })
        .collect();

    if notes.is_empty() {
        None
    } else {
        Some(notes.join("\n"))
    }
}

pub fn content_summary_prompt(rendered_item: &str) -> String {
    format!(
        "Summarize the following issue in a few sentences. Focus on the problem, \
         its impact and anything already tried.\n\n{rendered_item}\n\nSummary:"
    )
}

pub fn discussion_summary_prompt(discussion: &str) -> String {
    format!(
        "Summarize the discussion below. Keep decisions, open questions and the \
         current state.\n\n{discussion}\n\nSummary:"
    )
}

/// Context block listing the best past cases
pub fn context_block(matches: &[RetrievalMatch], limit: usize) -> String {
    if matches.is_empty() || limit == 0 {
        return NO_CONTEXT.to_string();
    }

    let mut parts = vec!["Related past cases:".to_string()];
    for (index, hit) in matches.iter().take(limit).enumerate() {
        parts.push(format!(
            "\nCase {} (similarity: {:.2}):",
            index + 1,
            hit.similarity
        ));
        parts.push(format!("Issue ID: {}", hit.item_id));
        parts.push(format!("Subject: {}", hit.subject));
        parts.push(format!("Content: {}", truncate_chars(&hit.content, CONTEXT_EXCERPT_CHARS)));
    }
    parts.join("\n")
}

pub fn advice_prompt(item: &Item, summaries: &ItemSummaries, context: &str) -> String {
    let discussion = summaries
        .journal_summary
        .as_deref()
        .unwrap_or("(no discussion yet)");
    format!(
        "You are an experienced engineer helping a team triage a new issue.\n\
         Using the related past cases, give concrete, actionable advice: likely \
         causes, things to check first and how similar cases were resolved.\n\n\
         Issue summary:\n{}\n\n\
         Discussion summary:\n{}\n\n\
         Issue:\n{}\n\n\
         {}\n\n\
         Advice:",
        summaries.content_summary,
        discussion,
        render_item(item),
        context
    )
}

/// Text posted to the tracker for a piece of advice
pub fn compose_comment(signature: &str, advice: &str) -> String {
    format!("{signature}:\n\n{advice}")
}

/// Truncate on a char boundary, marking the cut with an ellipsis
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
