mod gossiper;
pub mod node;
mod server;
pub mod settings;

pub use gossiper::*;
pub use server::*;
pub use settings::*;
