//! Prompt templates.

use paperrag_core::{Chunk, ConfigError};

/// The canonical "summarize the paper" question.
pub const SUMMARY_QUERY: &str = "Provide a complete summary of the article structured in sections: \
Introduction, Methodology, Results, Conclusion.";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

const SUMMARY_TEMPLATE: &str = "\
You are an assistant specialized in summarizing academic articles.
Use the following excerpts of the article to write a clear and structured summary.
Organize the summary in sections: Introduction, Methodology, Results, Conclusion.
Be precise and keep the important technical terms.

Context: {context}
Question: {question}
";

const ANSWER_TEMPLATE: &str = "\
You are an assistant specialized in academic articles.
Use the following excerpts of the article to answer the question directly.
If the excerpts do not contain the answer, say that you do not know.
Be precise and keep the important technical terms.

Context: {context}
Question: {question}
";

/// A prompt template with `{context}` and `{question}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Create a template; both placeholders must be present.
    pub fn new(text: impl Into<String>) -> Result<Self, ConfigError> {
        let text = text.into();
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !text.contains(placeholder) {
                return Err(ConfigError::InvalidTemplate(format!(
                    "template is missing the {placeholder} placeholder"
                )));
            }
        }
        Ok(Self { text })
    }

    /// Template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Substitute the placeholders in a single pass.
    ///
    /// Placeholder-like text inside `context` or `question` is left as is.
    #[must_use]
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.text.len() + context.len() + question.len());
        let mut rest = self.text.as_str();

        loop {
            let next = [(CONTEXT_PLACEHOLDER, context), (QUESTION_PLACEHOLDER, question)]
                .into_iter()
                .filter_map(|(placeholder, value)| {
                    rest.find(placeholder).map(|pos| (pos, placeholder, value))
                })
                .min_by_key(|(pos, _, _)| *pos);

            match next {
                Some((pos, placeholder, value)) => {
                    out.push_str(&rest[..pos]);
                    out.push_str(value);
                    rest = &rest[pos + placeholder.len()..];
                }
                None => {
                    out.push_str(rest);
                    return out;
                }
            }
        }
    }
}

/// Builds the prompt sent to the language model.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    summary: PromptTemplate,
    answer: PromptTemplate,
}

impl PromptComposer {
    /// Composer with the built-in templates.
    #[must_use]
    pub fn new() -> Self {
        Self {
            summary: PromptTemplate {
                text: SUMMARY_TEMPLATE.to_string(),
            },
            answer: PromptTemplate {
                text: ANSWER_TEMPLATE.to_string(),
            },
        }
    }

    /// Replace the summary template.
    pub fn with_summary_template(mut self, template: &str) -> Result<Self, ConfigError> {
        self.summary = PromptTemplate::new(template)?;
        Ok(self)
    }

    /// Replace the direct-answer template.
    pub fn with_answer_template(mut self, template: &str) -> Result<Self, ConfigError> {
        self.answer = PromptTemplate::new(template)?;
        Ok(self)
    }

    /// Whether `question` is the canonical summary question.
    #[must_use]
    pub fn is_summary_query(question: &str) -> bool {
        question.trim() == SUMMARY_QUERY
    }

    /// Compose the prompt for `question` over the retrieved `chunks`.
    ///
    /// The context is the chunk texts in retrieval order, separated by a
    /// blank line.
    #[must_use]
    pub fn compose(&self, chunks: &[Chunk], question: &str) -> String {
        let context = chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let template = if Self::is_summary_query(question) {
            &self.summary
        } else {
            &self.answer
        };
        template.render(&context, question.trim())
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new()
    }
}
