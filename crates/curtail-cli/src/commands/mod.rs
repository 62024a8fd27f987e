pub mod formulate;
pub mod run;
pub mod study;
pub mod validate;
