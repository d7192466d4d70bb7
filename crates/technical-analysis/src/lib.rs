pub mod indicators;
pub mod signals;
pub mod analyzer;
pub mod chart;


pub use indicators::*;
pub use signals::*;
pub use analyzer::*;
pub use chart::*;
