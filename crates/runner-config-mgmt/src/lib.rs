mod config_mgmt_runner;

pub use config_mgmt_runner::ConfigMgmtRunner;
