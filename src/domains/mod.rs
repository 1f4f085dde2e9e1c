pub mod fee;
pub mod roster;
