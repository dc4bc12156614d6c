use std::fmt;

use thiserror::Error;

use crate::run_state::{StepDeclaration, StepRecord, StepState};

/// Stable identifier for a tab/pane pair, assigned at creation. Tabs are
/// looked up by key, never by their displayed label: labels are free-form
/// user-provided step titles and may collide or change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabKey {
    Step(u32),
    Final,
}

impl fmt::Display for TabKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabKey::Step(index) => write!(f, "step-{index}"),
            TabKey::Final => f.write_str("final-report"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneContent {
    Processing,
    StepResult {
        result: String,
        execution_time: Option<String>,
    },
    StepError {
        error: String,
        execution_time: Option<String>,
    },
    FinalReport {
        body: String,
    },
}

/// The content area behind one tab. Panes are created once per key and
/// mutated in place so externally held references (download-by-step-number
/// actions) stay valid across a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    pub key: TabKey,
    pub label: String,
    pub heading: String,
    pub content: PaneContent,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TabError {
    #[error("unknown tab '{0}'")]
    UnknownTab(TabKey),
}

/// Owns the pane arena and the tab strip for one run. The strip is ordered
/// by arrival of terminal content; pending panes exist as placeholders from
/// run start and enter the strip when their step resolves. At most one key
/// is active at a time.
#[derive(Debug, Default, Clone)]
pub struct TabStrip {
    panes: Vec<Pane>,
    order: Vec<TabKey>,
    active: Option<TabKey>,
    run_error: Option<String>,
}

impl TabStrip {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the Pending-styled pane for one declared step. Called once
    /// per declaration at run start, in declaration order; idempotent by
    /// key. The first declared pane becomes the initially visible one.
    pub fn ensure_processing_tab(&mut self, declaration: &StepDeclaration) {
        let key = TabKey::Step(declaration.index);
        if self.pane(key).is_none() {
            self.panes.push(Pane {
                key,
                label: declaration.index.to_string(),
                heading: declaration.title.clone(),
                content: PaneContent::Processing,
            });
        }
        if self.active.is_none() {
            self.active = Some(key);
        }
    }

    /// Replaces the pane's content with the terminal rendering in place and
    /// activates it. The tab enters the strip on first resolution; a
    /// duplicate keeps its strip position and key. A still-pending record is
    /// ignored.
    pub fn resolve_step(&mut self, record: &StepRecord) {
        let content = match &record.state {
            StepState::Pending => return,
            StepState::Completed {
                result,
                execution_time,
            } => PaneContent::StepResult {
                result: result.clone(),
                execution_time: execution_time.clone(),
            },
            StepState::Failed {
                error,
                execution_time,
            } => PaneContent::StepError {
                error: error.clone(),
                execution_time: execution_time.clone(),
            },
        };

        let key = TabKey::Step(record.index);
        let Some(pane) = self.pane_mut(key) else {
            return;
        };
        pane.content = content;

        if !self.order.contains(&key) {
            self.order.push(key);
        }
        self.active = Some(key);
    }

    /// Creates the final-report pane on first use. The pane alone does not
    /// put the tab in the strip; only a delivered body does.
    fn ensure_final_pane(&mut self) {
        if self.pane(TabKey::Final).is_none() {
            self.panes.push(Pane {
                key: TabKey::Final,
                label: "Final".to_string(),
                heading: "Final Research Report".to_string(),
                content: PaneContent::FinalReport { body: String::new() },
            });
        }
    }

    /// Stores the report body in the final pane (creating the tab on first
    /// delivery) and activates it. A repeat overwrites the body in place and
    /// reuses the existing tab.
    pub fn store_final_report(&mut self, body: &str) {
        self.ensure_final_pane();
        if let Some(pane) = self.pane_mut(TabKey::Final) {
            pane.content = PaneContent::FinalReport {
                body: body.to_string(),
            };
        }
        if !self.order.contains(&TabKey::Final) {
            self.order.push(TabKey::Final);
        }
        self.active = Some(TabKey::Final);
    }

    /// Makes exactly one pane visible. Pending placeholders are selectable
    /// too; only a key that was never created is an error.
    pub fn switch_to(&mut self, key: TabKey) -> Result<(), TabError> {
        if self.pane(key).is_none() {
            return Err(TabError::UnknownTab(key));
        }
        self.active = Some(key);
        Ok(())
    }

    pub fn active(&self) -> Option<TabKey> {
        self.active
    }

    pub fn active_pane(&self) -> Option<&Pane> {
        self.pane(self.active?)
    }

    pub fn pane(&self, key: TabKey) -> Option<&Pane> {
        self.panes.iter().find(|pane| pane.key == key)
    }

    fn pane_mut(&mut self, key: TabKey) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|pane| pane.key == key)
    }

    /// Strip order: the keys of resolved tabs in arrival order.
    pub fn tab_keys(&self) -> &[TabKey] {
        &self.order
    }

    pub fn tab_count(&self) -> usize {
        self.order.len()
    }

    pub fn tabs(&self) -> impl Iterator<Item = &Pane> {
        self.order.iter().filter_map(|key| self.pane(*key))
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    /// One terminal error pane for the whole run. Already-resolved tabs are
    /// left intact.
    pub fn set_run_error(&mut self, message: impl Into<String>) {
        self.run_error = Some(message.into());
    }

    pub fn run_error(&self) -> Option<&str> {
        self.run_error.as_deref()
    }
}
