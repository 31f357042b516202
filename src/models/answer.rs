/// Ordered question → answer pairs from one ask round trip.
///
/// Keys are the question text itself, so two identical questions collapse
/// to a single entry. Insertion order is preserved and re-inserting a key
/// replaces its answer in place. Lookups are linear scans, which is fine
/// at the five-question cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerMap {
    entries: Vec<(String, String)>,
}

impl AnswerMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the answer for a question.
    pub fn insert(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        let question = question.into();
        let answer = answer.into();
        match self.entries.iter_mut().find(|(q, _)| *q == question) {
            Some((_, existing)) => *existing = answer,
            None => self.entries.push((question, answer)),
        }
    }

    /// Returns the answer for a question, if present.
    pub fn get(&self, question: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(q, _)| q == question)
            .map(|(_, a)| a.as_str())
    }

    /// Number of distinct questions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no answers have been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over (question, answer) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }
}
