mod unit;

pub use unit::{poll_stream, Command, Example, Query, Resource, ResourceFactory};
