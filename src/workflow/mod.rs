pub mod alert;
pub mod retrieval_ctx;
pub mod retrieval_flow;

pub use alert::{AlertClassifier, AlertKind};
pub use retrieval_ctx::RetrievalCtx;
pub use retrieval_flow::{
    transition, AttemptOutcome, RetrievalFlow, RetrievalOutcome, RetrievalReport,
    RetrievalSettings, RetrievalState, SkipReason, Transition,
};
