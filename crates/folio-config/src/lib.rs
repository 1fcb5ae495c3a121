pub mod annotations;
pub mod config;
pub mod error;
pub mod view;

#[cfg(test)]
pub mod test_utils;
