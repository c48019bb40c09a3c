pub mod proxy;

pub use proxy::{router, AppState, ErrorEnvelope};

use crate::utils::error::Result;
use tokio::net::TcpListener;

/// 在既有的 listener 上提供代理服務，收到 Ctrl-C 後結束
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("🌐 API proxy listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("🛑 Shutdown signal received");
            }
        })
        .await?;
    Ok(())
}
