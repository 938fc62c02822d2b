use super::ClassifierError;
use std::sync::Arc;
use tiktoken_rs::{CoreBPE, r50k_base};

/// Tokens the model reserves for `<s>` and `</s>`.
const SPECIAL_TOKENS: usize = 2;
/// Upper bound on bytes covered by one BPE token; limits how much text is ever encoded.
const MAX_BYTES_PER_TOKEN: usize = 32;

/// Keeps the longest prefix of a text that fits the classifier's token window.
///
/// Counting uses the GPT-2 byte-level BPE (`r50k_base`), the vocabulary RoBERTa-family
/// checkpoints are trained with. The encoder is loaded once and shared.
#[derive(Clone)]
pub struct TokenTruncator {
    encoding: Arc<CoreBPE>,
    budget: usize,
}

impl TokenTruncator {
    /// Build a truncator for a model whose window (special tokens included) is `max_tokens`.
    pub fn for_model(max_tokens: usize) -> Result<Self, ClassifierError> {
        let encoding = r50k_base().map_err(|source| ClassifierError::Tokenizer { source })?;
        Ok(Self {
            encoding: Arc::new(encoding),
            budget: max_tokens.saturating_sub(SPECIAL_TOKENS).max(1),
        })
    }

    /// Number of content tokens a text occupies.
    pub fn count(&self, text: &str) -> usize {
        self.encoding.encode_ordinary(text).len()
    }

    /// Content tokens available per request.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Return the longest prefix of `text` (on a char boundary) within the token budget.
    pub fn truncate<'a>(&self, text: &'a str) -> &'a str {
        let window = prefix_within_bytes(text, self.budget * MAX_BYTES_PER_TOKEN);
        if self.count(window) <= self.budget {
            return window;
        }

        let boundaries: Vec<usize> = window
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(window.len()))
            .collect();

        // boundaries[low] always fits; boundaries[high] never does.
        let mut low = 0;
        let mut high = boundaries.len() - 1;
        while high - low > 1 {
            let mid = low + (high - low) / 2;
            if self.count(&window[..boundaries[mid]]) <= self.budget {
                low = mid;
            } else {
                high = mid;
            }
        }
        &window[..boundaries[low]]
    }
}

impl TokenTruncator {
    /// [`TokenTruncator::truncate`] on the blocking pool, returning an owned prefix.
    pub async fn truncate_blocking(&self, text: &str) -> Result<String, ClassifierError> {
        let window = prefix_within_bytes(text, self.budget * MAX_BYTES_PER_TOKEN).to_owned();
        let truncator = self.clone();
        tokio::task::spawn_blocking(move || truncator.truncate(&window).to_owned())
            .await
            .map_err(|error| ClassifierError::Task(error.to_string()))
    }
}

fn prefix_within_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
