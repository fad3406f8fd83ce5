pub mod graph;
pub mod templates;

pub use graph::{CriticalPath, TaskGraph};
pub use templates::{
    decompose, dependencies, Reusability, TaskTemplate, TemplateDependency,
    RECOMMENDATION_LEAD_DAYS,
};
