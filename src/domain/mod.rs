mod money;
mod operation;
mod receiver;

pub use money::*;
pub use operation::*;
pub use receiver::*;
