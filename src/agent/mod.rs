//! Agent layer: intent classification, routing, SQL generation, and
//! insight/visualization generation.

pub mod analysis;
pub mod command;
pub mod query;
pub mod router;
pub mod supervisor;

pub use analysis::AnalysisAgent;
pub use command::{parse_slash_command, SlashCommand};
pub use query::{QueryAgent, QueryResult};
pub use router::{Classification, Route, RoutingDecision};
pub use supervisor::Supervisor;
