mod mvn_about;
mod project;

pub use self::{mvn_about::*, predicates::*, project::*};
