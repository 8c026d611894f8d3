pub mod run;
pub mod value;

pub use run::*;
pub use value::*;
