pub mod datetime;
pub mod enums;
pub mod filters;
pub mod interaction;
pub mod journey;
pub mod lead;
pub mod lookup;
pub mod patient;
pub mod person;
pub mod physician;
pub mod relationship;
pub mod role;

pub use filters::*;
pub use interaction::*;
pub use journey::*;
pub use lead::*;
pub use lookup::*;
pub use patient::*;
pub use person::*;
pub use physician::*;
pub use relationship::*;
pub use role::*;
