mod frontend;
mod input;
mod menu;
pub mod theme;

pub use frontend::TuiFrontend;
