pub mod location;

pub use location::LocationStore;
