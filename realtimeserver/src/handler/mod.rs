pub mod client_handler;

pub use client_handler::ClientHandler;
