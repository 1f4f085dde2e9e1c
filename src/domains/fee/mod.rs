pub mod types;
pub mod schedule;
pub mod resolver;
pub mod repository;
pub mod service;

pub use types::{
    ActivationSummary, AssociationType, DistributionSummary, FamilyFeeRecord, FamilyRef, FeeDefinition,
    FeeType, PaymentStatus, ScheduleEntry,
};
pub use schedule::{build_family_fee_record, build_family_fee_record_with, ClippedTotalPolicy, ScheduleOptions};
pub use resolver::FamilyResolver;
pub use repository::{FeeRepository, StoreFeeRepository};
pub use service::{FeeService, FeeServiceImpl};
