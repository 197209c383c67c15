pub(crate) mod account;
pub(crate) mod instructor;
pub(crate) mod student;

mod helper;
