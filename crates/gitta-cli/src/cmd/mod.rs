pub mod config;
pub mod doctor;
pub mod id;
pub mod init;
pub mod sprint;
