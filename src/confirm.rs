//! Interactive confirmation before applying updates

use crate::update::Plan;
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Asks whether the planned updates should be applied
pub trait Confirmer: Send + Sync {
    /// Returns true to proceed
    fn confirm(&self, plan: &Plan) -> bool;
}

/// Fixed answer, used for `--yes` and tests
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirmer for AutoConfirm {
    fn confirm(&self, _plan: &Plan) -> bool {
        self.0
    }
}

/// Prompts on stderr and reads the answer from stdin
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, plan: &Plan) -> bool {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{}", describe_plan(plan));
        let _ = write!(stderr, "Apply these updates? [y/N]: ");
        let _ = stderr.flush();

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input).is_err() {
            return false;
        }
        is_yes(&input)
    }
}

/// Lists the planned updates, one unit per block
pub fn describe_plan(plan: &Plan) -> String {
    let mut out = format!("{} update(s) planned:\n", plan.action_count());
    for unit in &plan.units {
        if unit.is_group() {
            out.push_str(&format!("  {}\n", unit.label().cyan()));
        }
        for action in &unit.actions {
            let indent = if unit.is_group() { "    " } else { "  " };
            out.push_str(&format!(
                "{}{} {} {} {}\n",
                indent,
                action.package.name.bold(),
                action.package.current_version(),
                "→".dimmed(),
                action.target.green()
            ));
        }
    }
    out
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionUnit, Package, PlannedAction};

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_auto_confirm() {
        let plan = Plan::default();
        assert!(AutoConfirm(true).confirm(&plan));
        assert!(!AutoConfirm(false).confirm(&plan));
    }

    #[test]
    fn test_describe_plan() {
        colored::control::set_override(false);
        let mut unit = ExecutionUnit::new("react", None);
        unit.actions.push(PlannedAction::new(
            Package::new("npm", "react", "^", "17.0.0"),
            "17.0.2",
        ));
        let plan = Plan {
            units: vec![unit],
            results: Vec::new(),
        };
        let text = describe_plan(&plan);
        assert!(text.starts_with("1 update(s) planned:"));
        assert!(text.contains("react 17.0.0 → 17.0.2"));
    }
}
