pub mod builder;
pub mod command;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod inventory;
pub mod parameter;
pub mod pipeline;
pub mod repository;
pub mod runner;
pub mod status;
pub mod strategy;
pub mod target;

pub use builder::CommandBuilder;
pub use command::{CommandTemplate, ExecutableCommand, ExecutionPlan, RunnerKind};
pub use config::Config;
pub use coordinator::{CommandOutcome, ExecutionCoordinator, Outcome, RunReport};
pub use error::{CommandExecutionError, OrchestratorError};
pub use inventory::{Inventory, InventorySnapshot, StaticInventory, YamlInventory};
pub use parameter::{ParameterKey, ParameterSet};
pub use pipeline::{Pipeline, Stage};
pub use runner::{CommandRunner, RunnerFactory};
pub use status::{ExecutionStatus, StatusBoard, StatusCell, StatusResult, StatusSink};
pub use target::{TargetInstance, TargetRole};
