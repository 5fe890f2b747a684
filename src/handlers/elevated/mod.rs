pub mod audit;
pub mod databases;
pub mod tables;
pub mod users;
