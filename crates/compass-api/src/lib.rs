pub mod adapters;
pub mod api;
pub mod dto;
pub mod jobs;

pub use api::{app, setup, AppState, RiskOverviewDto};
pub use dto::{
    AlertDto, ChanceResultDto, Cursor, DeadlineDto, FactorDto, FitResultDto, RiskDto, TaskDto,
};
pub use jobs::{JobIntervals, JobRunner};
