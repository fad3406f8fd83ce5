pub mod application_store;
pub mod clock;
pub mod college_store;
pub mod data_source;
pub mod decision_store;
pub mod profile_store;

pub use application_store::{ApplicationStore, PendingDependency};
pub use clock::{Clock, FixedClock, SystemClock};
pub use college_store::CollegeStore;
pub use data_source::{CollegeDataSource, ModelTrainer, TrainedModel};
pub use decision_store::DecisionStore;
pub use profile_store::ProfileStore;

#[cfg(any(test, feature = "testing"))]
pub use application_store::MockApplicationStore;
#[cfg(any(test, feature = "testing"))]
pub use college_store::MockCollegeStore;
#[cfg(any(test, feature = "testing"))]
pub use data_source::{MockCollegeDataSource, MockModelTrainer};
#[cfg(any(test, feature = "testing"))]
pub use decision_store::MockDecisionStore;
#[cfg(any(test, feature = "testing"))]
pub use profile_store::MockProfileStore;
