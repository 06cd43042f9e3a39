pub mod client;
#[cfg(test)]
pub mod mock;
pub mod query;
