pub mod fetch;
pub mod run;
pub mod show;
pub mod source;
