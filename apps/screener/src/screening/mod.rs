//! Screening pipeline: evaluation units, the session coordinator and the
//! external collaborators they call (similarity lookup, LLM explanation).

pub mod coordinator;
pub mod evaluator;
pub mod explanation;
pub mod external;
pub mod handlers;
pub mod prompts;
pub mod ranking;
pub mod similarity;
pub mod summary;
pub mod unit;

pub use coordinator::SessionCoordinator;
