pub mod definition;
pub mod registry;
pub mod schema;

pub use definition::{CommandDefinition, CommandKind, CommandOption};
pub use registry::{CommandCollection, CommandRegistry};
pub use schema::CommandSchema;
