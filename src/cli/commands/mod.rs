mod prune;
mod serve;

pub use prune::PruneCommand;
pub use serve::ServeCommand;
