//! Model and prompt-style presets forwarded verbatim to the backend.

/// Language model the backend routes a question to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LlmModel {
    #[default]
    Gpt35Turbo,
    Claude3Haiku,
    Llama3Instruct,
    GeminiPro,
    /// Any other backend model id, passed through unchanged.
    Custom(String),
}

impl LlmModel {
    pub fn as_str(&self) -> &str {
        match self {
            LlmModel::Gpt35Turbo => "openai/gpt-3.5-turbo",
            LlmModel::Claude3Haiku => "anthropic/claude-3-haiku",
            LlmModel::Llama3Instruct => "meta-llama/llama-3-8b-instruct",
            LlmModel::GeminiPro => "google/gemini-pro",
            LlmModel::Custom(id) => id,
        }
    }

    pub fn from_id(id: &str) -> Self {
        match id {
            "openai/gpt-3.5-turbo" => LlmModel::Gpt35Turbo,
            "anthropic/claude-3-haiku" => LlmModel::Claude3Haiku,
            "meta-llama/llama-3-8b-instruct" => LlmModel::Llama3Instruct,
            "google/gemini-pro" => LlmModel::GeminiPro,
            other => LlmModel::Custom(other.to_string()),
        }
    }

    pub fn all() -> Vec<LlmModel> {
        vec![
            LlmModel::Gpt35Turbo,
            LlmModel::Claude3Haiku,
            LlmModel::Llama3Instruct,
            LlmModel::GeminiPro,
        ]
    }

    pub fn display_name(&self) -> String {
        format_model_name(self.as_str())
    }
}

/// Short label for a model id, used on message badges.
pub fn format_model_name(model: &str) -> String {
    match model {
        "" => "Unknown".to_string(),
        "openai/gpt-3.5-turbo" => "GPT-3.5".to_string(),
        "anthropic/claude-3-haiku" => "Claude 3 Haiku".to_string(),
        "meta-llama/llama-3-8b-instruct" => "Llama 3 8B".to_string(),
        "google/gemini-pro" => "Gemini Pro".to_string(),
        other => other
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(other)
            .to_string(),
    }
}

/// Named preset altering answer phrasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    #[default]
    Concise,
    Technical,
    Casual,
}

impl PromptStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStyle::Concise => "concise",
            PromptStyle::Technical => "technical",
            PromptStyle::Casual => "casual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "concise" => Some(PromptStyle::Concise),
            "technical" => Some(PromptStyle::Technical),
            "casual" => Some(PromptStyle::Casual),
            _ => None,
        }
    }

    pub fn all() -> Vec<PromptStyle> {
        vec![PromptStyle::Concise, PromptStyle::Technical, PromptStyle::Casual]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PromptStyle::Concise => "Concise",
            PromptStyle::Technical => "Technical",
            PromptStyle::Casual => "Casual",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids_round_trip_through_presets() {
        for model in LlmModel::all() {
            assert_eq!(LlmModel::from_id(model.as_str()), model);
        }
    }

    #[test]
    fn test_unknown_model_is_passed_through() {
        let model = LlmModel::from_id("mistralai/mistral-7b-instruct");
        assert_eq!(model.as_str(), "mistralai/mistral-7b-instruct");
        assert_eq!(model.display_name(), "mistral-7b-instruct");
    }

    #[test]
    fn test_format_model_name() {
        assert_eq!(format_model_name("anthropic/claude-3-haiku"), "Claude 3 Haiku");
        assert_eq!(format_model_name("plain-model"), "plain-model");
        assert_eq!(format_model_name(""), "Unknown");
    }

    #[test]
    fn test_prompt_style_parsing_is_case_insensitive() {
        assert_eq!(PromptStyle::from_str("Technical"), Some(PromptStyle::Technical));
        assert_eq!(PromptStyle::from_str("poetic"), None);
    }
}
