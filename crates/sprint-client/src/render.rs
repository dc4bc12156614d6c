use sprint_run::{PaneContent, RunState, StepState, TabStrip};

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub width: usize,
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 96,
            color: true,
        }
    }
}

const ACCENT: &str = "33";
const OK: &str = "32";
const ERR: &str = "31";
const MUTED: &str = "90";

fn paint(code: &str, text: &str, color: bool) -> String {
    if color {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

/// Renders the tab strip, the per-step progress line, and the active pane
/// as terminal lines. Pure view over the run state; owns nothing.
pub fn render_run(state: &RunState, tabs: &TabStrip, options: &RenderOptions) -> Vec<String> {
    let width = options.width.max(20);
    let mut lines = Vec::new();

    let mut strip = Vec::new();
    for pane in tabs.tabs() {
        let cell = if Some(pane.key) == tabs.active() {
            paint(ACCENT, &format!("[{}]", pane.label), options.color)
        } else {
            format!(" {} ", pane.label)
        };
        strip.push(cell);
    }
    if !strip.is_empty() {
        lines.push(format!("tabs: {}", strip.join(" ")));
    }

    let progress = state
        .steps()
        .iter()
        .map(|record| {
            let (glyph, code) = match record.state {
                StepState::Pending => ("..", MUTED),
                StepState::Completed { .. } => ("ok", OK),
                StepState::Failed { .. } => ("err", ERR),
            };
            paint(code, &format!("{}:{glyph}", record.index), options.color)
        })
        .collect::<Vec<_>>();
    lines.push(format!(
        "steps {}/{}  {}",
        state.resolved_count(),
        state.step_count(),
        progress.join("  ")
    ));

    if let Some(message) = tabs.run_error() {
        lines.push(paint(ERR, message, options.color));
    }

    if let Some(pane) = tabs.active_pane() {
        lines.push(String::new());
        lines.push(paint(ACCENT, &pane.heading, options.color));
        match &pane.content {
            PaneContent::Processing => {
                lines.push(paint(
                    MUTED,
                    &format!("Processing step {}...", pane.label),
                    options.color,
                ));
            }
            PaneContent::StepResult {
                result,
                execution_time,
            } => {
                lines.extend(wrap_text(result, width));
                if let Some(elapsed) = execution_time {
                    lines.push(paint(
                        MUTED,
                        &format!("Execution time: {elapsed}"),
                        options.color,
                    ));
                }
            }
            PaneContent::StepError {
                error,
                execution_time,
            } => {
                for line in wrap_text(error, width) {
                    lines.push(paint(ERR, &line, options.color));
                }
                if let Some(elapsed) = execution_time {
                    lines.push(paint(
                        MUTED,
                        &format!("Execution time: {elapsed}"),
                        options.color,
                    ));
                }
            }
            PaneContent::FinalReport { body } => {
                lines.extend(wrap_text(body, width));
            }
        }
    }

    lines
}

/// Greedy word wrap preserving paragraph breaks. Words longer than the
/// width are split at the width boundary.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.lines() {
        if raw_line.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };

            if needed <= width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if word.chars().count() > width {
                let mut chars = word.chars().peekable();
                while chars.peek().is_some() {
                    lines.push(chars.by_ref().take(width).collect());
                }
            } else {
                current.push_str(word);
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}
