//! Input and output formats of the `payportal` driver.

pub mod csv;
pub mod journal;
