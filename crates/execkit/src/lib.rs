//! # execkit
//!
//! Building blocks for driving external command-line tools:
//!
//! - [`Workspace`]: an owned scratch directory removed on cleanup or drop
//! - [`Invocation`]: a command line with working dir, env and redacted secrets
//! - [`ProcessRunner`]: the trait orchestration code runs commands through
//! - [`SystemRunner`]: the real implementation, spawning child processes
//!
//! ## Example
//!
//! ```no_run
//! use execkit::{Invocation, ProcessRunner, SystemRunner, Workspace};
//!
//! let ws = Workspace::new("example").unwrap();
//! let manifest = ws.write_file("manifest.yml", b"name: demo").unwrap();
//!
//! let inv = Invocation::new("cat").arg(&manifest).current_dir(ws.path());
//! let output = SystemRunner::new().run(&inv).unwrap();
//! assert_eq!(output.stdout_str(), "name: demo");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod runner;
pub mod workspace;

pub use error::{Error, ErrorKind, Result};
pub use runner::{CommandOutput, Invocation, ProcessRunner, SystemRunner, find_binary};
pub use workspace::Workspace;
