use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("{provider} request failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Unparseable model reply: {0}")]
    Malformed(String),

    #[error("Not a recipe: {reason}")]
    NotARecipe { reason: String },

    #[error("Recipe analysis timed out")]
    Timeout,
}

impl ExtractError {
    pub fn not_a_recipe(reason: impl Into<String>) -> Self {
        Self::NotARecipe {
            reason: reason.into(),
        }
    }

    /// Message written to the failed job and shown to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider { .. } => {
                "The recipe analysis service is unavailable right now. Please try again later"
            }
            Self::Malformed(_) => "We couldn't read a recipe from this video. Please try again",
            Self::NotARecipe { .. } => "This video doesn't appear to contain a recipe",
            Self::Timeout => "Recipe analysis took too long. Please try again",
        }
        .to_string()
    }
}
