pub mod gateway;
pub mod growchief;
pub mod postiz;
