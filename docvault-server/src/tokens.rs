//! Token counting for `/count-tokens`.

use std::path::Path;

use thiserror::Error;
use tokenizers::Tokenizer;
use tracing::info;

#[derive(Debug, Error)]
#[error("tokenizer error: {0}")]
pub struct TokenizerError(pub String);

/// Counts the tokens a text occupies for the embedding model.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> Result<usize, TokenizerError>;
}

/// [`TokenCounter`] backed by a HuggingFace `tokenizer.json`.
///
/// Counts include the model's special tokens (`<s>`, `</s>`, ...), i.e. the
/// length the model actually sees.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    pub fn from_file(path: &Path) -> Result<Self, TokenizerError> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            TokenizerError(format!("cannot load tokenizer from '{}': {e}", path.display()))
        })?;
        info!(path = %path.display(), "loaded tokenizer");
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> Result<usize, TokenizerError> {
        let encoding =
            self.tokenizer.encode(text, true).map_err(|e| TokenizerError(e.to_string()))?;
        Ok(encoding.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tokenizer_file_is_reported() {
        let err = HfTokenCounter::from_file(Path::new("/nonexistent/tokenizer.json"))
            .err()
            .expect("loading must fail");
        assert!(err.to_string().contains("/nonexistent/tokenizer.json"));
    }
}
