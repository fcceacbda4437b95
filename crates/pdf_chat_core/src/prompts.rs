//! crates/pdf_chat_core/src/prompts.rs
//!
//! Prompt templates sent to the completion service.

use crate::domain::Exchange;

/// Renders prior exchanges as `Question:`/`Answer:` pairs separated by a blank line.
///
/// `exchanges` must already be in chronological order.
pub fn render_history(exchanges: &[Exchange]) -> String {
    exchanges
        .iter()
        .map(|exchange| {
            format!(
                "Question: {}\nAnswer: {}",
                exchange.question, exchange.response
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn question_prompt(text: &str, history: &str, question: &str) -> String {
    format!(
        "Context from PDF: \"{text}\"\n\
         Previous conversation:\n\
         {history}\n\
         \n\
         Current question: {question}\n\
         \n\
         Please provide a detailed answer to the current question based on the PDF content \
         and previous conversation context."
    )
}

pub fn summary_prompt(text: &str) -> String {
    format!("Please provide a comprehensive summary of the following text: {text}")
}

pub fn flow_prompt(text: &str) -> String {
    format!(
        "Generate a structured flow or outline of the main concepts and their relationships \
         from the following text: {text}"
    )
}
