pub mod acquire;
pub mod admin;
pub mod poll;

pub mod util;
