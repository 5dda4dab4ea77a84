pub mod input;
pub mod logging;
pub mod output;
pub mod quant;
pub mod runner;
pub mod scanid;
