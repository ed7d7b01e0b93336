//! Transcript and enhanced-text buffers
//!
//! Both buffers are owned by the pipeline controller task; background tasks
//! never touch them directly.

/// Append-only sequence of recognized utterances
///
/// Utterances are appended in recognition-completion order, which may differ
/// from capture order when several recognitions are in flight. Rendering
/// concatenates them with separating whitespace.
#[derive(Debug, Default)]
pub struct Transcript {
    utterances: Vec<String>,
}

impl Transcript {
    /// Create an empty transcript
    #[must_use]
    pub const fn new() -> Self {
        Self {
            utterances: Vec::new(),
        }
    }

    /// Append one recognized utterance
    pub fn append(&mut self, utterance: impl Into<String>) {
        self.utterances.push(utterance.into());
    }

    /// Whether no speech has been recognized (or everything was cleared)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.utterances.iter().all(|u| u.trim().is_empty())
    }

    /// Number of utterances appended so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    /// Render the transcript as display text
    ///
    /// Each utterance is followed by a single space unless it already ends
    /// in whitespace, so "hello" + "world " renders as "hello world ".
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for utterance in &self.utterances {
            out.push_str(utterance);
            if !utterance.ends_with(char::is_whitespace) {
                out.push(' ');
            }
        }
        out
    }

    /// Drop all utterances
    pub fn clear(&mut self) {
        self.utterances.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_with_separating_whitespace() {
        let mut transcript = Transcript::new();
        transcript.append("hello");
        transcript.append("world ");
        assert_eq!(transcript.render(), "hello world ");
    }

    #[test]
    fn append_order_is_preserved() {
        let mut transcript = Transcript::new();
        transcript.append("B");
        transcript.append("A");
        assert_eq!(transcript.render(), "B A ");
    }

    #[test]
    fn empty_and_whitespace_only() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.render(), "");

        transcript.append("   ");
        assert!(transcript.is_empty());

        transcript.append("speech");
        assert!(!transcript.is_empty());
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut transcript = Transcript::new();
        transcript.append("something");
        transcript.clear();
        assert!(transcript.is_empty());
        assert_eq!(transcript.render(), "");
    }
}
