pub mod spec;
pub mod grants;
pub mod router;
pub mod snapshot;

pub use spec::*;
pub use grants::*;
pub use router::*;
pub use snapshot::*;
