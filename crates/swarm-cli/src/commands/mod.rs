pub mod config;
pub mod pipeline;
pub mod plan;
pub mod run;
pub mod targets;

pub use config::run as config;
pub use pipeline::run as pipeline;
pub use plan::run as plan;
pub use run::run;
pub use targets::run as targets;
