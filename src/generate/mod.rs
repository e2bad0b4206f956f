//! Request shaping for the three model calls: plan, code, extraction.

pub mod code;
pub mod extract;
pub mod plan;

pub use code::CodeGenerator;
pub use extract::DataExtractor;
pub use plan::PlanGenerator;
