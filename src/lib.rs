pub mod anki;
pub mod config;
pub mod core;
pub mod llm;
pub mod processors;
pub mod review;

#[cfg(test)]
mod testing;
