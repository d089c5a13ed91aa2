pub mod inspect;
pub mod nuke;
pub mod resource_types;
