pub mod chancing;
pub mod config;
pub mod domain;
pub mod fit;
pub mod ports;
pub mod risk;
pub mod services;
pub mod tasks;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use domain::{
    AcademicMetrics,
    Activity,
    ActivityTier,
    AlertLevel,
    Application,
    ApplicationRound,
    CanonicalTaskKind,
    CdsFactors,
    ChanceCategory,
    ChanceHistoryEntry,
    ChanceResult,
    ChangeLogEntry,
    ChangedBy,
    College,
    CollegeDeadlines,
    CourseLevel,
    Coursework,
    DeadlineAlert,
    DeadlineType,
    DecisionKind,
    DecisionRecord,
    Demographics,
    DependencyType,
    DomainError,
    Factor,
    FactorImportance,
    FitCategory,
    FitResult,
    FitWeights,
    GpaPercentiles,
    JeeCutoff,
    JeeCutoffs,
    ModelVersion,
    Override,
    Preferences,
    Profile,
    ProfileSnapshot,
    Region,
    RegionalMetrics,
    RequirementProfile,
    ReservationCategory,
    RiskAssessment,
    RiskFactor,
    RiskLevel,
    Subscores,
    Task,
    TaskDependency,
    TaskStatus,
    TaskStatusChange,
    TaskType,
    TestPolicy,
    TestScorePercentiles,
    UserDeadline,
};

pub use config::EngineConfig;

pub use ports::{
    ApplicationStore, Clock, CollegeDataSource, CollegeStore, DecisionStore, FixedClock,
    ModelTrainer, PendingDependency, ProfileStore, SystemClock, TrainedModel,
};

pub use services::{
    BatchError, BatchOutcome, ChanceService, CompareOutcome, ExplainTrace, FitService,
    LedgerService, ProfileService, RefreshOutcome, RefreshService, RetrainOutcome, RiskOverview,
    RiskService, ScenarioOutcome, StatusUpdateOutcome, TaskService,
};

pub use chancing::{ChanceDelta, ProposedChanges, ScenarioDiff, ScenarioSummary};

pub use fit::FitComputation;

pub use risk::RiskComputation;

pub use tasks::{CriticalPath, TaskGraph, TaskTemplate};
