mod budget;
mod money;
mod savings;
mod transaction;
mod user;

pub use budget::*;
pub use money::*;
pub use savings::*;
pub use transaction::*;
pub use user::*;
