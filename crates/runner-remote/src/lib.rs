mod remote_runner;

pub use remote_runner::RemoteExecRunner;
