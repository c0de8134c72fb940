pub mod crawler;
pub mod error;
pub mod node;
pub mod result;
pub mod sink;
pub mod token;
pub mod transport;

pub use crawler::{AbortHandle, Crawler, Exploration};
pub use error::{ExploreError, Failure, FailureKind};
pub use node::{Node, NodeId, Position};
pub use result::{BranchFailure, ExploreStats};
pub use sink::{ChannelSink, CollectingSink, DiscoveryEvent, DiscoverySink};
pub use token::SessionToken;
pub use transport::{Fetched, GraphRequest, HttpTransport, Transport, TransportConfig};
