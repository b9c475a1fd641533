mod enums;
mod money;
mod snapshot;

pub use enums::*;
pub use money::*;
pub use snapshot::*;
