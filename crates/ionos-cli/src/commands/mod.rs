pub mod challenge;
pub mod serve_dns;

pub use challenge::ChallengeCommand;
pub use serve_dns::ServeDnsCommand;
