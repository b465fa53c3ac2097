use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::page::ProfilePage;

/// Bounds for driving an infinite-scroll page.
#[derive(Debug, Clone)]
pub struct ScrollPolicy {
    pub max_attempts: usize,
    /// Pixels scrolled per attempt.
    pub scroll_offset: i64,
    /// Pause after each scroll so lazily loaded items can render.
    pub settle_delay: Duration,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            scroll_offset: 2500,
            settle_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convergence {
    /// Items counted on the last check.
    pub rendered: usize,
    pub scrolls: usize,
    pub converged: bool,
}

/// Scroll until at least `target` nodes match `selector` or the attempt
/// budget runs out. Running out is not an error; the caller continues with
/// whatever has rendered.
pub async fn converge(
    page: &dyn ProfilePage,
    selector: &str,
    target: usize,
    policy: &ScrollPolicy,
) -> Result<Convergence> {
    let mut rendered = 0;
    let mut scrolls = 0;

    for attempt in 0..policy.max_attempts {
        rendered = page.count(selector).await?;
        if rendered >= target {
            debug!(attempt, rendered, target, "scroll: converged");
            return Ok(Convergence {
                rendered,
                scrolls,
                converged: true,
            });
        }

        debug!(attempt, rendered, target, "scroll: need more items");
        page.scroll_by(policy.scroll_offset).await?;
        scrolls += 1;
        tokio::time::sleep(policy.settle_delay).await;
    }

    warn!(
        rendered,
        target,
        scrolls,
        "scroll: attempt budget exhausted, continuing with rendered items"
    );
    Ok(Convergence {
        rendered,
        scrolls,
        converged: false,
    })
}
