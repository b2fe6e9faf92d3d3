pub use client::TplClient;

mod client;
pub mod protocol;
