//! Prompt text sent to the model.

use crate::article::{SearchHit, Title};

pub const ARTICLE_SYSTEM_PROMPT: &str = "\
You are writing articles for an encyclopedia from an alternate reality.
Your task is to create short, fascinating articles that maintain internal consistency with existing content.
Write in a professional, encyclopedia-like style.
Use markdown formatting.
Include many [[wiki style links]] to reference other potential articles. There should be at least a link per paragraph, and every place and person's name should have a link. A link may carry a label: [[Target article|shown text]].
When a statement relies on one of the related articles you are given, cite it inline as {{cite|Article title}}.
Be creative but maintain a serious, academic tone.
Articles should feel like they're from a complete, coherent alternate universe.";

pub const SUMMARY_SYSTEM_PROMPT: &str = "\
You are a summary generator for a full text search engine. You will summarise each message in less than 100 words.
The messages are wiki articles. You should only output the summary.
Please try to retain as many keywords as possible from the original text.";

const NO_CONTEXT: &str = "No related articles found.";

/// Render the related-articles block that grounds the new article.
pub fn context_block(context: &[SearchHit]) -> String {
    if context.is_empty() {
        return NO_CONTEXT.to_string();
    }

    let mut block = String::from("Related articles in our encyclopedia:\n\n");
    for hit in context {
        block.push_str(&format!(
            "From article about {}:\n{}\n\n",
            hit.title.display(),
            hit.excerpt
        ));
    }
    block.truncate(block.trim_end().len());
    block
}

pub fn article_user_prompt(title: &Title, context: &[SearchHit]) -> String {
    format!(
        "Write an article about: {topic}

Here is the context from related articles in our encyclopedia that you should maintain consistency with:

{context}

The article should include:
1. A clear introduction
2. Multiple sections with headers (using ## for h2 headers)
3. References to other articles using [[wiki style links]]
4. At least one quote from a fictional scholar or historical figure
5. Specific dates and events from our alternate timeline
6. A 'References' section at the end with 3-5 fictional sources
7. Maintains consistency with the context provided above, citing it with {{{{cite|Article title}}}} where used

Format the article in markdown.",
        topic = title.display(),
        context = context_block(context),
    )
}
