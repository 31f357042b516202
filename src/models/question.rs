use crate::error::ValidationError;

/// Maximum number of question slots in a set.
pub const MAX_QUESTIONS: usize = 5;

/// Maximum length of a single question, in characters.
pub const MAX_QUESTION_LEN: usize = 40;

/// A single question slot.
///
/// Text is stored trimmed. Blank text is a placeholder: it keeps its
/// position in the set but is never submitted to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    /// Creates a question from user text, trimming surrounding whitespace.
    ///
    /// Returns `ValidationError::QuestionTooLong` when the trimmed text
    /// exceeds [`MAX_QUESTION_LEN`] characters.
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        let text = text.into().trim().to_string();
        let len = text.chars().count();
        if len > MAX_QUESTION_LEN {
            return Err(ValidationError::QuestionTooLong {
                len,
                max: MAX_QUESTION_LEN,
            });
        }
        Ok(Self(text))
    }

    /// Creates an empty placeholder slot.
    pub fn blank() -> Self {
        Self(String::new())
    }

    /// Returns the question text.
    pub fn text(&self) -> &str {
        &self.0
    }

    /// True for placeholder slots that must not be submitted.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

/// An ordered set of 1–5 question slots.
///
/// The set is never empty (at least one placeholder slot always exists)
/// and never grows past [`MAX_QUESTIONS`]. Insertion order is significant:
/// it determines how answers are aligned with questions.
///
/// # Examples
///
/// ```
/// use glance::QuestionSet;
///
/// let mut set = QuestionSet::new();
/// set.update(0, "Is flood damage covered?").unwrap();
/// set.add();
/// set.update(1, "What is the claim limit?").unwrap();
///
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.non_empty().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl Default for QuestionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionSet {
    /// Creates a set with a single blank slot.
    pub fn new() -> Self {
        Self {
            questions: vec![Question::blank()],
        }
    }

    /// Returns the number of slots, placeholders included.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always false; a set keeps at least one slot.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Appends a blank slot. Silently does nothing once the set holds
    /// [`MAX_QUESTIONS`] slots.
    pub fn add(&mut self) {
        if self.questions.len() < MAX_QUESTIONS {
            self.questions.push(Question::blank());
        }
    }

    /// Removes the slot at `index`. Silently does nothing when the index
    /// is out of range or removal would leave the set empty.
    pub fn remove(&mut self, index: usize) {
        if self.questions.len() > 1 && index < self.questions.len() {
            self.questions.remove(index);
        }
    }

    /// Replaces the text of the slot at `index`.
    ///
    /// Over-long text is rejected and the set is left unchanged. An
    /// out-of-range index is a silent no-op, matching `add`/`remove`.
    pub fn update(&mut self, index: usize, text: &str) -> Result<(), ValidationError> {
        if index >= self.questions.len() {
            return Ok(());
        }
        let question = Question::new(text)?;
        self.questions[index] = question;
        Ok(())
    }

    /// Returns the slot at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Iterates over every slot in order, placeholders included.
    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    /// Returns the ordered non-blank questions, the only thing that is
    /// ever submitted to the backend.
    pub fn non_empty(&self) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|q| !q.is_blank())
            .cloned()
            .collect()
    }
}
