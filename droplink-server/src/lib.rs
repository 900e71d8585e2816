mod routes;
mod state;

pub use routes::router;
pub use state::MailboxState;

use std::net::SocketAddr;
use tracing::info;

/// Binds and runs the mailbox service until the task is cancelled.
pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let state = MailboxState::default();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("mailbox server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
