pub mod dashboard;
pub mod finances;
