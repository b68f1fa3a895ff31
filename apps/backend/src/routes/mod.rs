pub mod badges;
pub mod cases;
pub mod chat;
pub mod dashboard;
pub mod study;
pub mod users;
