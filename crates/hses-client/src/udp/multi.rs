//! Multi-command fan-out over heterogeneous command tuples.
//!
//! All sub-commands share one deadline and run concurrently. The first
//! error wins: the remaining sub-sessions are dropped, which unbinds their
//! reply sinks and discards any late replies. Response tuples keep input
//! order regardless of the order replies arrive in.

use async_trait::async_trait;
use hses_proto::udp::Command;
use tokio::time::Instant;

use crate::error::Error;
use crate::udp::client::Client;

/// A heterogeneous list of commands dispatched as one aggregate session.
///
/// Implemented for tuples of up to eight [`Command`] values.
#[async_trait]
pub trait CommandSet: Send {
    /// Tuple of the sub-command responses, in input order.
    type Response: Send;

    /// Dispatch every sub-command concurrently under `deadline`.
    async fn send_all(self, client: &Client, deadline: Instant) -> Result<Self::Response, Error>;
}

#[async_trait]
impl<C0> CommandSet for (C0,)
where
    C0: Command + 'static,
{
    type Response = (C0::Response,);

    async fn send_all(self, client: &Client, deadline: Instant) -> Result<Self::Response, Error> {
        Ok((client.send_command_at(self.0, deadline).await?,))
    }
}

macro_rules! impl_command_set {
    ($($command:ident => $index:tt),+) => {
        #[async_trait]
        impl<$($command),+> CommandSet for ($($command,)+)
        where
            $($command: Command + 'static,)+
        {
            type Response = ($($command::Response,)+);

            async fn send_all(
                self,
                client: &Client,
                deadline: Instant,
            ) -> Result<Self::Response, Error> {
                tokio::try_join!($(client.send_command_at(self.$index, deadline)),+)
            }
        }
    };
}

impl_command_set!(C0 => 0, C1 => 1);
impl_command_set!(C0 => 0, C1 => 1, C2 => 2);
impl_command_set!(C0 => 0, C1 => 1, C2 => 2, C3 => 3);
impl_command_set!(C0 => 0, C1 => 1, C2 => 2, C3 => 3, C4 => 4);
impl_command_set!(C0 => 0, C1 => 1, C2 => 2, C3 => 3, C4 => 4, C5 => 5);
impl_command_set!(C0 => 0, C1 => 1, C2 => 2, C3 => 3, C4 => 4, C5 => 5, C6 => 6);
impl_command_set!(
    C0 => 0, C1 => 1, C2 => 2, C3 => 3, C4 => 4, C5 => 5, C6 => 6, C7 => 7
);
