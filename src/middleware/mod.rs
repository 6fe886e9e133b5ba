pub mod gate;
pub mod metrics;
pub mod negotiate;
pub mod validator;
