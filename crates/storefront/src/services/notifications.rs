//! Flash notifications.
//!
//! Messages queued during one request and shown (then dropped) by the next
//! rendered page. A session failure only loses the message, so errors are
//! logged rather than returned.

use tower_sessions::Session;

use crate::models::{Flash, session_keys};

/// Queue a notification for the next rendered page.
pub async fn push(session: &Session, flash: Flash) {
    let mut pending: Vec<Flash> = match session.get(session_keys::FLASH).await {
        Ok(pending) => pending.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read pending notifications");
            Vec::new()
        }
    };
    pending.push(flash);

    if let Err(e) = session.insert(session_keys::FLASH, pending).await {
        tracing::warn!(error = %e, "Failed to queue notification");
    }
}

/// Take every queued notification, leaving none behind.
pub async fn take(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(session_keys::FLASH).await {
        Ok(pending) => pending.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read pending notifications");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::session;

    #[tokio::test]
    async fn test_push_then_take_once() {
        let session = session();
        push(&session, Flash::success("Added to cart")).await;
        push(&session, Flash::error("Only 1 left")).await;

        let taken = take(&session).await;
        assert_eq!(
            taken,
            vec![Flash::success("Added to cart"), Flash::error("Only 1 left")]
        );
        assert!(take(&session).await.is_empty());
    }
}
