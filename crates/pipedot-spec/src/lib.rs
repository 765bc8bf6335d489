//! Spec state, its command-log actor, and the graph exporter that turns a
//! spec into a runnable DAG (§4.7, §4.8).

pub mod actor;
pub mod card;
pub mod command;
pub mod error;
pub mod event;
pub mod exporter;
pub mod state;

pub use actor::{spawn_spec_actor, SpecHandle};
pub use card::{Card, CardType, Lane};
pub use command::{Command, CommandAck};
pub use error::{SpecError, SpecResult};
pub use event::{SpecEvent, SpecEventKind};
pub use exporter::export_graph;
pub use state::{PendingQuestion, SpecCore, SpecState, TranscriptEntry};
