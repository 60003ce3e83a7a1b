//! Prompt templates for the component assistant

use serde_json::Value;

/// Asks the model which components a question is about
///
/// `{query}` is replaced with the user's question.
pub const PRE_VECTOR_QUERY: &str = "You will identify the relevant components being queried by the user.
You will only output the components and make no other comments, as doing so would break the application.
{query}.
You must provide output as an array of strings. It is imperative to only return the array.";

/// System prompt sent with the first question of a conversation
pub const SYSTEM_PROMPT: &str = "You are an expert Vue UI Storefront developer.
You will provide a clear and concise answer to the given question, that includes the properties of the components and a code snippet.
The code provided is relevant source code. This is NOT my code. It is SOURCE CODE that you must use to answer the question.
You must provide the answer in markdown format.
Use the components that make the most sense in a production environment. Try to use the given components, not the ones making them up.
";

/// Shortened system prompt kept in the conversation history
pub const HISTORY_SYSTEM_PROMPT: &str = "You are an expert UI Storefront developer.";

/// Reply when no relevant component could be found
pub const NO_CONTEXT_REPLY: &str =
    "I'm sorry, but I couldn't find any relevant components to your query. Please try again.";

const CONTEXT_SEPARATOR: &str = "-------------------------------------------------";

/// Render the concept-extraction prompt for a question
pub fn concept_prompt(query: &str) -> String {
    PRE_VECTOR_QUERY.replace("{query}", query)
}

/// Join retrieved snippets, each followed by a separator line
pub fn format_context(snippets: &[String]) -> String {
    snippets
        .iter()
        .map(|snippet| format!("{}\n{}\n", snippet, CONTEXT_SEPARATOR))
        .collect()
}

/// User message for the first question of a conversation
pub fn build_question(query: &str, context: &str) -> String {
    format!("Question: {}\n. Code: {}", query, context)
}

/// Read the model's answer as a JSON array of component names
///
/// Anything other than an array of strings yields no concepts. Blank entries
/// are dropped.
pub fn parse_concepts(answer: &str) -> Option<Vec<String>> {
    let value: Value = serde_json::from_str(answer.trim()).ok()?;
    let items = value.as_array()?;

    let mut concepts = Vec::with_capacity(items.len());
    for item in items {
        let concept = item.as_str()?.trim();
        if !concept.is_empty() {
            concepts.push(concept.to_string());
        }
    }
    Some(concepts)
}
