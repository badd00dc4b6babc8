pub mod event;
pub mod operator;
pub mod sync;
pub mod ticket;
pub mod user;
