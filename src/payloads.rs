pub mod account;
pub mod instructor;
pub mod student;
