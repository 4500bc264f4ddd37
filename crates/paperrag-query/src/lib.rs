//! Prompt composition and answer generation for paperrag.
//!
//! A question is answered in one pass: embed it, retrieve the closest
//! chunks, fill a prompt template with them and send the prompt to the
//! language model once. No conversation history is kept between questions.

pub mod generator;
pub mod openai;
pub mod prompt;

pub use generator::{AnswerGenerator, DEFAULT_TOP_K};
pub use openai::{OpenAiGenerator, DEFAULT_CHAT_MODEL};
pub use prompt::{PromptComposer, PromptTemplate, SUMMARY_QUERY};
