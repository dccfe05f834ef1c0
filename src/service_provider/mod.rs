pub mod arithmetic;
pub mod slack;
