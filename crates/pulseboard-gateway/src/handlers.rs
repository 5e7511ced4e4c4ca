//! Plain HTTP endpoint handlers.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Static readiness string |

use crate::state::READINESS_MESSAGE;

/// Serve the readiness string. Load balancers and humans both hit this.
pub async fn index() -> &'static str {
    READINESS_MESSAGE
}
