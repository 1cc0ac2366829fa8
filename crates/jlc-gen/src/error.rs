use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Semantic error in class \"{class_name}\": {message}! (line {line})")]
pub struct GenError {
    pub class_name: String,
    pub message: String,
    pub line: u32,
}

impl GenError {
    pub fn new(class_name: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        GenError {
            class_name: class_name.into(),
            message: message.into(),
            line,
        }
    }
}
