/*
 * Token counting strategies. The folder source reports two kinds of counts for
 * every file: a cheap estimate that is computed on every scan, and an accurate
 * count that is only computed on request. Both sit behind `TokenCounterOperations`
 * so the folder source can be tested with mocks.
 *
 * - `CharHeuristicTokenCounter`: roughly four characters per token.
 * - `CoreTikTokenCounter`: the `cl100k_base` BPE from `tiktoken-rs`.
 */
use log::error;
use tiktoken_rs::{CoreBPE, cl100k_base};

pub const CHARS_PER_ESTIMATED_TOKEN: usize = 4;

pub trait TokenCounterOperations: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/*
 * Counts tokens with the `cl100k_base` model. The BPE tables are loaded once at
 * construction; if that fails, counting degrades to the character heuristic and
 * the failure is logged.
 */
pub struct CoreTikTokenCounter {
    bpe: Option<CoreBPE>,
}

impl CoreTikTokenCounter {
    pub fn new() -> Self {
        let bpe = match cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(e) => {
                error!(
                    "CoreTikTokenCounter: Failed to initialize cl100k_base: {e:?}. Falling back to character estimate."
                );
                None
            }
        };
        CoreTikTokenCounter { bpe }
    }
}

impl Default for CoreTikTokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounterOperations for CoreTikTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => CharHeuristicTokenCounter.count_tokens(text),
        }
    }
}

/* `ceil(chars / 4)`: the estimate shipped with every folder scan. */
#[derive(Debug, Clone, Copy, Default)]
pub struct CharHeuristicTokenCounter;

impl CharHeuristicTokenCounter {
    pub fn new() -> Self {
        CharHeuristicTokenCounter
    }
}

impl TokenCounterOperations for CharHeuristicTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(CHARS_PER_ESTIMATED_TOKEN)
    }
}
