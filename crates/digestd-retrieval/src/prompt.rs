//! Prompt text sent to the search providers.

use std::fmt::Write as _;

use digestd_core::{DigestContext, QuerySet};

/// Prompt for the web-search provider. Only `queries.terms` are used.
#[must_use]
pub fn web_search_prompt(queries: &QuerySet, context: &DigestContext) -> String {
    let mut prompt =
        String::from("Find the latest and most relevant information about the following topics:\n");
    push_numbered(&mut prompt, &queries.terms);
    prompt.push('\n');
    push_context(&mut prompt, context);
    prompt.push_str(
        "\nFor each topic, provide:\n\
         1. Recent developments and news\n\
         2. Key updates and changes\n\
         3. Important context and background\n\n\
         Structure the response to clearly separate information for each topic.\n\
         Prioritize information that aligns with the digest's purpose and frequency.\n",
    );
    prompt
}

/// Prompt for the social-search provider: topics, accounts and hashtags.
#[must_use]
pub fn social_search_prompt(queries: &QuerySet, context: &DigestContext) -> String {
    let mut prompt = String::from("Get me real-time data on the following inputs:\n");

    if !queries.terms.is_empty() {
        prompt.push_str("\nFind the latest and most relevant information about the following topics:\n");
        push_numbered(&mut prompt, &queries.terms);
    }
    if !queries.handles.is_empty() {
        prompt.push_str("\nMonitor and summarize recent posts from these X (Twitter) accounts:\n");
        push_numbered(&mut prompt, &queries.handles);
    }
    if !queries.hashtags.is_empty() {
        prompt.push_str("\nMonitor and summarize recent posts from these X (Twitter) hashtags:\n");
        push_numbered(&mut prompt, &queries.hashtags);
    }

    prompt.push('\n');
    push_context(&mut prompt, context);
    prompt.push_str(
        "\nFor each topic and X account, provide:\n\
         1. Recent developments and news\n\
         2. Key updates and changes\n\
         3. Important context and background\n\n\
         Structure the response to clearly separate information for each topic and X account.\n\
         Prioritize information that aligns with the digest's purpose and frequency.\n",
    );
    prompt
}

fn push_numbered(prompt: &mut String, items: &[String]) {
    for (index, item) in items.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {item}", index + 1);
    }
}

fn push_context(prompt: &mut String, context: &DigestContext) {
    let _ = writeln!(
        prompt,
        "This is a {} digest, so focus on information relevant to this time period.",
        context.frequency.as_str()
    );
    if let Some(description) = context.description.as_deref() {
        let _ = writeln!(prompt, "Additional context about this digest: {description}");
    }
}
