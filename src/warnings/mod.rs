pub mod templates;
pub mod classifier;
pub mod policy;

pub use templates::{WarningTemplate, TEMPLATES};
pub use classifier::{classify, WarningClassifier};
pub use policy::{can_approve, WarningPolicy};
