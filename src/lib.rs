pub mod clients;
pub mod config;
pub mod deserializers;
pub mod driver;
pub mod error;
pub mod ledger;
pub mod session;
pub mod subject;
pub mod token;

pub use driver::{DriverSnapshot, InterviewDriver, Phase, ScoreSummary, Step};
pub use error::{LensError, Result};
pub use session::SessionContext;
pub use subject::{Category, ReportArtifact, ScoreTier, SubjectRecord};

