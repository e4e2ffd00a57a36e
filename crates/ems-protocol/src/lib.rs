pub mod conversation;
pub mod credentials;
pub mod endpoints;
pub mod range;
pub mod trace;

pub use conversation::*;
pub use credentials::*;
pub use endpoints::*;
pub use range::*;
pub use trace::*;
