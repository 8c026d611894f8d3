pub mod errors;
pub mod storage;
pub mod study;
pub mod trial;

pub use errors::*;
pub use storage::*;
pub use study::*;
pub use trial::*;
