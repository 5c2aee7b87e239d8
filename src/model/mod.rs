pub mod attendance;
pub mod condition_report;
pub mod employee;
pub mod leave_request;
pub mod roster;
pub mod shift;
pub mod swap_request;
