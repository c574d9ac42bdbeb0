pub mod handlers;
pub mod observer;
pub mod packs;
pub mod seat;
pub mod server;
pub mod table;
pub mod view;
