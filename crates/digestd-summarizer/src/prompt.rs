use digestd_core::{Citation, RetrievedContent};

const SUMMARY_PROMPT: &str = r#"You are an expert content summarizer. Your task is to create a concise, well-structured digest from the following content.

Content to summarize:
{content}

Sources:
{sources}

Create a digest with the following structure:
1. Group content by source term/topic
2. For each group, provide 2-3 key points
3. Keep summaries concise (1-2 sentences per point)
4. Maintain original URLs for reference, copied exactly from the sources list
5. Focus on the most important and recent information

Format the response as a JSON object with this structure:
{
  "title": "string",
  "date": "string",
  "sections": [
    {
      "title": "string",
      "items": [
        {
          "title": "string",
          "summary": "string",
          "url": "string",
          "source_term": "string"
        }
      ]
    }
  ]
}

Remember:
- Keep it concise and scannable
- Focus on key insights
- Maintain original source attribution
- Use clear, professional language
- Respond with ONLY the JSON object"#;

/// Build the summarization prompt from every provider's output.
pub(crate) fn summary_prompt(contents: &[RetrievedContent]) -> String {
    let content = contents
        .iter()
        .map(|c| c.content.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    let citations: Vec<&Citation> = contents.iter().flat_map(|c| &c.citations).collect();
    let sources = serde_json::to_string_pretty(&citations).unwrap_or_default();

    SUMMARY_PROMPT
        .replace("{content}", &content)
        .replace("{sources}", &sources)
}
