pub mod config;
pub mod console;
pub mod execute;
pub mod fetch;
pub mod gate;
pub mod inspect;
pub mod locate;
pub mod pipeline;
pub mod plan;

#[cfg(test)]
mod testutil;
