mod expand;
mod ext;

pub use expand::Expand;
pub use ext::PathExt;
