pub mod generator;
pub(crate) mod http;
pub mod registry;
pub mod traits;

pub use generator::HttpQuestionGenerator;
pub use registry::HttpRegistry;
pub use traits::{QuestionBatch, QuestionGenerator, QuestionRequest, SubjectRegistry};
