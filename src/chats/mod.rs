//! Multi-turn conversations that keep their history locally.

use snafu::Snafu;

use crate::client::Error as ClientError;

pub mod builder;
pub mod session;

pub use builder::ChatBuilder;
pub use session::ChatSession;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("client invocation error"))]
    Client { source: Box<ClientError> },

    #[snafu(display("invalid chat history at entry {index}: {reason}"))]
    InvalidHistory { index: usize, reason: String },
}
