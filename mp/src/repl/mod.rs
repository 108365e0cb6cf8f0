//! Interactive chat front end for the planner

mod session;

pub use session::ChatRepl;
