//! Prompt text for blog-post generation

/// System and user message pair sent to a chat-completion provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogPrompt {
    pub system: String,
    pub user: String,
}

impl BlogPrompt {
    /// Flattened form for providers without chat roles (Ollama generate)
    pub fn flattened(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

const FINANCE_SYSTEM: &str = "You are a financial content assistant that transforms YouTube video transcripts \
into engaging, well-structured blog posts. The output should be concise, informative, and tailored for a blog \
focused on stocks, mutual funds, personal finance, investments, and loans. Use clear headings, logical flow, \
and a professional tone that matches the original video's intent.";

const FINANCE_INSTRUCTIONS: &str = "Instructions:
1. Start with a compelling **Introduction** that hooks the reader and briefly explains the video's topic, creator, and relevance to finance/investing.
2. Create a **Main Content** section, structured with relevant **subheadings**. Group ideas into themes like: market trends, investment strategies, stock analysis, or financial tips, depending on the transcript content.
3. Summarize the speaker's key points clearly and concisely. Where helpful, **explain terminology** or include short definitions.
4. If the video includes recommendations (e.g., specific stocks or funds), present them in bullet points or tables for clarity.
5. Conclude with a **Summary** that captures the overall message and any actionable takeaways for investors.
6. Maintain a logical flow between sections. Use simple language without losing financial accuracy or insight.
7. Where applicable, mention any tools, strategies, or sources referenced in the video.";

const GENERAL_SYSTEM: &str = "You are a helpful assistant that summarizes YouTube video transcripts into concise, \
well-structured blog posts. Focus on the main points and key takeaways while maintaining the original context \
and meaning.";

/// Finance blog prompt used with the primary provider
pub fn finance_blog_prompt(transcript: &str) -> BlogPrompt {
    BlogPrompt {
        system: FINANCE_SYSTEM.to_string(),
        user: format!(
            "Please summarize this transcript into a blog post:\n\n{}\n\n{}",
            transcript, FINANCE_INSTRUCTIONS
        ),
    }
}

/// General-purpose blog prompt used with fallback providers
pub fn general_blog_prompt(transcript: &str) -> BlogPrompt {
    BlogPrompt {
        system: GENERAL_SYSTEM.to_string(),
        user: format!(
            "Please summarize the following YouTube video transcript into a well-structured blog post:\n\n{}",
            transcript
        ),
    }
}
