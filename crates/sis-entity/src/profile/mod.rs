//! Role-specific profiles and role assignment inputs.

pub mod enrollment;
pub mod model;

pub use enrollment::{
    AdminEnrollment, AssignedProfile, RoleAssignment, StudentEnrollment, TeacherEnrollment,
};
pub use model::{Guardian, StudentProfile, TeacherProfile};
