pub mod collection;
pub mod error;
pub mod event;
pub mod id;
pub mod query;
pub mod row;
mod subscription;

pub use collection::*;
pub use error::*;
pub use event::*;
pub use id::*;
pub use query::*;
pub use row::*;
pub use subscription::SubscriptionId;
