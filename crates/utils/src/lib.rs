pub mod error;

mod shutdown;

pub use shutdown::ShutdownFlag;
