pub mod doctor;
pub mod search;
