//! Prompt templates for categorization and distillation

use quotequest_common::Result;

use crate::types::IdQuote;

/// Shared persona for both tasks
pub const ARCHIVIST_ROLE: &str = "You are a theological archivist with deep knowledge of the Baha'i Faith.";

/// Categorization instructions. `{keyword}` and `{quotes_json}` are substituted.
pub const CATEGORIZATION_TEMPLATE: &str = r#"{role} You will receive full paragraphs that all contain the keyword "{keyword}". Group them into themes according to how the keyword is used.

The paragraphs are quotations from Baha'i scripture and historical texts. Read them in that theological and historical context; allegorical language and descriptions of historical conflict are not contemporary speech.

Instructions:
1. Read every paragraph and identify between 5 and 16 recurring themes.
2. Name each theme with a short descriptive phrase in sentence case (for example "The role of just government").
3. Place every paragraph in EXACTLY ONE theme.
4. Paragraphs that fit none of your themes go to "Uncategorized".
5. The input is a JSON array; each object has a unique "id" and the full "quote".
6. Reply with one theme per line: the theme name, a colon, then every matching id written back to back. Do NOT put spaces, commas or any separator between ids.
7. Reply with nothing else.

Example reply:

Theme name A:a1b7
Theme name B:a2
Uncategorized:a3

Paragraphs to categorize:
{quotes_json}"#;

/// Distillation instructions. `{keyword}` and `{paragraph}` are substituted.
pub const DISTILLATION_TEMPLATE: &str = r#"{role} Produce a short excerpt of the paragraph below for the keyword.

Instructions:
1. The excerpt must contain the keyword.
2. The excerpt must convey how the keyword is used in the paragraph.
3. Copy the original words exactly, including punctuation.
4. Keep enough context to be understood on its own, usually 10 to 15 words.
5. Do not begin or end the excerpt with an ellipsis.
6. When you leave out words in the middle, mark the omission with an ellipsis.
7. Return only the excerpt: no commentary, no explanation, no surrounding quotation marks.

Keyword: "{keyword}"

Paragraph:
"{paragraph}"

Excerpt:"#;

/// Build the categorization prompt for a batch of quotes
pub fn categorization_prompt(keyword: &str, quotes: &[IdQuote]) -> Result<String> {
    let quotes_json = serde_json::to_string_pretty(quotes)?;
    Ok(CATEGORIZATION_TEMPLATE
        .replace("{role}", ARCHIVIST_ROLE)
        .replace("{keyword}", keyword)
        .replace("{quotes_json}", &quotes_json))
}

/// Build the distillation prompt for one paragraph
pub fn distillation_prompt(keyword: &str, paragraph: &str) -> String {
    // Paragraph last: its text may itself contain brace sequences
    DISTILLATION_TEMPLATE
        .replace("{role}", ARCHIVIST_ROLE)
        .replace("{keyword}", keyword)
        .replace("{paragraph}", paragraph)
}
