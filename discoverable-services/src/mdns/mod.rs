pub mod advertise;
pub mod browser;
pub mod engine;

#[cfg(test)]
pub mod simulator;
