pub mod resource;
pub mod rooms;
pub mod utils;
