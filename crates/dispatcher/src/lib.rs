pub mod dispatcher;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod routing;
