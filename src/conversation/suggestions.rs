/// Rotating deck of example utterances shown as the input placeholder.
#[derive(Debug, Clone, Default)]
pub struct PromptSuggestions {
    prompts: Vec<String>,
    cursor: usize,
}

impl PromptSuggestions {
    pub fn new(prompts: Vec<String>) -> Self {
        let prompts = prompts
            .into_iter()
            .map(|prompt| prompt.trim().to_string())
            .filter(|prompt| !prompt.is_empty())
            .collect();
        Self { prompts, cursor: 0 }
    }

    pub fn current(&self) -> Option<&str> {
        self.prompts.get(self.cursor).map(String::as_str)
    }

    /// Moves to the next prompt, wrapping around the deck.
    pub fn advance(&mut self) -> Option<String> {
        if self.prompts.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.prompts.len();
        self.current().map(str::to_string)
    }
}
