mod lock;
mod mutex;

pub use lock::*;
pub use mutex::*;
