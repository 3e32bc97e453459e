//! Re-segmentation of generated text into small delivery chunks.
//!
//! Text is tokenized into runs of non-space characters plus their trailing
//! whitespace. Tokens accumulate in a buffer that is flushed as one chunk once
//! it holds `min_words` tokens or the latest token closes a clause
//! (`. ! ? : ;` or a newline). Leading whitespace rides on the first token, so
//! concatenating the chunks always reproduces the input exactly.
//!
//! [`segment`] works on a complete string; [`Segmenter`] accepts fragments as
//! they arrive from a streamed completion and yields the same chunks.

const CLAUSE_TERMINATORS: [char; 5] = ['.', '!', '?', ':', ';'];

/// Length of the first token in `s` when a following word proves it complete.
fn complete_token_len(s: &str) -> Option<usize> {
    let mut seen_word = false;
    let mut in_trailing_space = false;
    for (i, c) in s.char_indices() {
        if c.is_whitespace() {
            if seen_word {
                in_trailing_space = true;
            }
        } else if in_trailing_space {
            return Some(i);
        } else {
            seen_word = true;
        }
    }
    None
}

fn closes_clause(token: &str) -> bool {
    let word = token.trim_end();
    word.ends_with(CLAUSE_TERMINATORS) || token.get(word.len()..).is_some_and(|ws| ws.contains('\n'))
}

// ---------------------------------------------------------------------------
// One-shot
// ---------------------------------------------------------------------------

/// Lazily split `text` into chunks of at least `min_words` words.
pub fn segment(text: &str, min_words: usize) -> Segments<'_> {
    Segments {
        text,
        pos: 0,
        min_words: min_words.max(1),
    }
}

/// Iterator returned by [`segment`].
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    text: &'a str,
    pos: usize,
    min_words: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.text.get(self.pos..)?;
        if rest.is_empty() {
            return None;
        }

        let mut end = 0usize;
        let mut words = 0usize;
        while let Some(tail) = rest.get(end..).filter(|t| !t.is_empty()) {
            let len = complete_token_len(tail).unwrap_or(tail.len());
            let token = tail.get(..len).unwrap_or(tail);
            end = end.saturating_add(len);
            words = words.saturating_add(1);
            if words >= self.min_words || closes_clause(token) {
                break;
            }
        }

        let chunk = rest.get(..end)?;
        self.pos = self.pos.saturating_add(end);
        Some(chunk)
    }
}

// ---------------------------------------------------------------------------
// Incremental
// ---------------------------------------------------------------------------

/// Incremental segmenter for streamed text.
///
/// A token is only known to be complete once the next word starts, so the
/// final token of the stream is held until [`Segmenter::finish`].
#[derive(Debug, Clone)]
pub struct Segmenter {
    min_words: usize,
    pending: String,
    buffer: String,
    words: usize,
}

impl Segmenter {
    /// Segmenter flushing every `min_words` words (at least one).
    pub fn new(min_words: usize) -> Self {
        Self {
            min_words: min_words.max(1),
            pending: String::new(),
            buffer: String::new(),
            words: 0,
        }
    }

    /// Feed a fragment and return the chunks it completes.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.pending.push_str(fragment);
        let mut chunks = Vec::new();
        while let Some(len) = complete_token_len(&self.pending) {
            let token: String = self.pending.drain(..len).collect();
            if let Some(chunk) = self.take_token(&token) {
                chunks.push(chunk);
            }
        }
        chunks
    }

    /// Flush whatever remains at end of input.
    pub fn finish(&mut self) -> Option<String> {
        self.buffer.push_str(&self.pending);
        self.pending.clear();
        self.words = 0;
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    fn take_token(&mut self, token: &str) -> Option<String> {
        self.buffer.push_str(token);
        self.words = self.words.saturating_add(1);
        if self.words >= self.min_words || closes_clause(token) {
            self.words = 0;
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }
}
