//! Query loop settings

/// Settings for a `QueryLoop`
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// System prompt sent with every model call
    pub system_prompt: Option<String>,

    /// Max tokens per model response
    pub max_tokens: u32,

    /// Upper bound on model calls per query; `None` means unbounded
    pub max_turns: Option<u32>,

    /// Re-list tools at the start of every query instead of using the cached catalog
    pub refresh_catalog: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_tokens: 4096,
            max_turns: None,
            refresh_catalog: true,
        }
    }
}
