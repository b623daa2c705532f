pub mod session;
pub mod voice;

pub use session::*;
pub use voice::*;
