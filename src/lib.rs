pub mod cli;
pub mod io;
pub mod logging;
pub mod model;
pub mod ops;
pub mod service;
pub mod sync;
pub mod tui;
pub mod util;
