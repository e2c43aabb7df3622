//! The external operation the orchestrator drives.
//!
//! Everything that actually talks to the platform lives behind
//! [`Collaborator`]. The core only sees success or an [`OperationFailure`].

mod command;
mod output;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::checkpoint::DiscoveredItem;
use crate::retry::OperationFailure;

pub use command::CommandCollaborator;
pub use output::{failure_from_output, parse_item_line, render_args, status_from_text};

/// External collaborator contract.
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Fetch one unit of content, presenting `identity`.
    async fn perform(&self, source_reference: &str, identity: &str) -> Result<(), OperationFailure>;

    /// List the content behind `source`, sending each item as it is found.
    /// Items already sent stay valid even when the call later fails.
    async fn enumerate(
        &self,
        source: &str,
        identity: &str,
        items: mpsc::Sender<DiscoveredItem>,
    ) -> Result<(), OperationFailure>;
}
