//! Disclosure widget expansion on a live page.
//!
//! Runs in rounds: each round lists the widgets currently in the document
//! and expands the ones not tried yet. Opening a parent accordion can
//! reveal nested ones, which the next round picks up. A round that expands
//! nothing ends the loop.
//!
//! Each interaction is bounded by a per-widget timeout; a widget that
//! times out or never reports itself expanded is recorded and skipped.
//! The whole phase is bounded by a budget, and exceeding it aborts the page.

use std::collections::HashSet;
use std::time::Duration;

use crate::render::{DisclosureSurface, RenderError, Widget};

/// Timing and bounds for disclosure expansion.
#[derive(Debug, Clone)]
pub struct ExpandOptions {
    /// Ceiling for one expand interaction plus its state change.
    pub per_widget_timeout: Duration,
    /// Pause after a successful expansion so lazy content can load.
    pub settle: Duration,
    /// Ceiling for the whole expansion phase.
    pub budget: Duration,
    /// Maximum number of rounds.
    pub max_rounds: u32,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            per_widget_timeout: Duration::from_millis(1_000),
            settle: Duration::from_millis(500),
            budget: Duration::from_millis(15_000),
            max_rounds: 3,
        }
    }
}

/// What happened to one widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisclosureOutcome {
    Expanded,
    AlreadyExpanded,
    /// Interaction ran but the widget never reported an expanded state.
    NoEffect,
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosureAction {
    pub widget: Widget,
    pub outcome: DisclosureOutcome,
}

/// Expand every disclosure widget on `surface`.
///
/// Returns the actions taken, one per widget seen. Fails only when the
/// overall budget runs out.
pub async fn expand_disclosures<S>(surface: &S, opts: &ExpandOptions) -> Result<Vec<DisclosureAction>, RenderError>
where
    S: DisclosureSurface + ?Sized,
{
    tokio::time::timeout(opts.budget, expand_rounds(surface, opts))
        .await
        .map_err(|_| RenderError::Timeout(opts.budget.as_millis() as u64))
}

async fn expand_rounds<S>(surface: &S, opts: &ExpandOptions) -> Vec<DisclosureAction>
where
    S: DisclosureSurface + ?Sized,
{
    let mut actions = Vec::new();
    let mut attempted = HashSet::new();

    for round in 1..=opts.max_rounds {
        let widgets = match surface.widgets().await {
            Ok(widgets) => widgets,
            Err(e) => {
                tracing::warn!(round, "could not list disclosure widgets: {e}");
                break;
            }
        };

        let mut expanded = 0usize;
        for widget in widgets {
            if !attempted.insert(widget.id) {
                continue;
            }

            let outcome = expand_one(surface, &widget, opts).await;
            match &outcome {
                DisclosureOutcome::Expanded => expanded += 1,
                DisclosureOutcome::Failed(reason) => {
                    tracing::debug!(widget = widget.id, label = %widget.label, "expand failed: {reason}")
                }
                DisclosureOutcome::TimedOut | DisclosureOutcome::NoEffect => {
                    tracing::debug!(widget = widget.id, label = %widget.label, ?outcome, "widget did not expand")
                }
                DisclosureOutcome::AlreadyExpanded => {}
            }
            actions.push(DisclosureAction { widget, outcome });
        }

        tracing::debug!(round, expanded, "disclosure round complete");
        if expanded == 0 {
            break;
        }
    }

    actions
}

async fn expand_one<S>(surface: &S, widget: &Widget, opts: &ExpandOptions) -> DisclosureOutcome
where
    S: DisclosureSurface + ?Sized,
{
    match surface.is_expanded(widget).await {
        Ok(true) => return DisclosureOutcome::AlreadyExpanded,
        Ok(false) => {}
        Err(e) => return DisclosureOutcome::Failed(e.to_string()),
    }

    let attempt = tokio::time::timeout(opts.per_widget_timeout, async {
        if !surface.expand(widget).await? {
            return Ok::<bool, RenderError>(false);
        }
        loop {
            if surface.is_expanded(widget).await? {
                return Ok(true);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;

    match attempt {
        Ok(Ok(true)) => {
            tokio::time::sleep(opts.settle).await;
            DisclosureOutcome::Expanded
        }
        Ok(Ok(false)) => DisclosureOutcome::NoEffect,
        Ok(Err(e)) => DisclosureOutcome::Failed(e.to_string()),
        // A widget that was triggered but never flipped state lands here too.
        Err(_) => DisclosureOutcome::TimedOut,
    }
}
