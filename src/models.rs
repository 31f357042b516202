mod answer;
mod document;
mod question;

pub use answer::AnswerMap;
pub use document::{
    ALLOWED_MIME_TYPES, ALLOWED_URL_EXTENSIONS, DocumentHandle, DocumentRef, MAX_DOCUMENT_BYTES,
};
pub use question::{MAX_QUESTION_LEN, MAX_QUESTIONS, Question, QuestionSet};
