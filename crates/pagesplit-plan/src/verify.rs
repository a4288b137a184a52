//! Checks on finished plans.
//!
//! `check_plan` runs on every plan before it is returned; the `assert_*`
//! helpers are for tests and debug tooling.

use pagesplit_core::budget::SizeBudget;
use pagesplit_core::error::{Error, Result};
use pagesplit_core::part::PartitionPlan;

/// Coverage: parts are contiguous, in order, and span `[0, page_count)`.
/// Budget: each part fits, or is a single page flagged `exceeds_budget`.
pub fn check_plan(plan: &PartitionPlan, page_count: usize, budget: &SizeBudget) -> Result<()> {
    check_coverage(plan, page_count)?;

    for part in plan.parts() {
        let fits = budget.fits(part.size());
        if part.exceeds_budget {
            if part.range.len() != 1 {
                return Err(Error::Invariant(format!(
                    "{} is flagged over budget but spans {} pages",
                    part.range,
                    part.range.len()
                )));
            }
            if fits {
                return Err(Error::Invariant(format!(
                    "{} is flagged over budget but fits ({} bytes)",
                    part.range,
                    part.size()
                )));
            }
        } else if !fits {
            return Err(Error::Invariant(format!(
                "{} is {} bytes, over the {:.0} byte threshold",
                part.range,
                part.size(),
                budget.threshold()
            )));
        }
    }
    Ok(())
}

fn check_coverage(plan: &PartitionPlan, page_count: usize) -> Result<()> {
    let mut next = 0;
    for range in plan.ranges() {
        if range.start() != next {
            return Err(Error::Invariant(format!(
                "{range} does not start at page {}",
                next + 1
            )));
        }
        next = range.end() + 1;
    }
    if next != page_count {
        return Err(Error::Invariant(format!(
            "plan covers {next} of {page_count} pages"
        )));
    }
    Ok(())
}

/// Panic unless the plan covers `[0, page_count)` exactly once, in order.
pub fn assert_covers(plan: &PartitionPlan, page_count: usize) {
    if let Err(e) = check_coverage(plan, page_count) {
        panic!("coverage violated: {e}");
    }
}

/// Panic unless every part fits or is a flagged single page.
pub fn assert_within_budget(plan: &PartitionPlan, budget: &SizeBudget) {
    for part in plan.parts() {
        assert!(
            budget.fits(part.size()) || (part.exceeds_budget && part.range.len() == 1),
            "{} is {} bytes against a {:.0} byte threshold",
            part.range,
            part.size(),
            budget.threshold()
        );
    }
}
