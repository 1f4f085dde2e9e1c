pub mod types;
pub mod repository;

pub use types::{Family, Student, StudioClass};
pub use repository::{
    ClassRepository, FamilyRepository, StudentRepository,
    StoreClassRepository, StoreFamilyRepository, StoreStudentRepository,
};
