/// Bounded batch of work for one pump of a cooperative scheduler.
///
/// Budgets are expressed in abstract "operation units" rather than wall-clock
/// time, so the amount of work done per pump is predictable and testable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchBudget {
    initial_units: u32,
    remaining_units: u32,
}

impl BatchBudget {
    pub fn new(units: u32) -> Self {
        Self {
            initial_units: units,
            remaining_units: units,
        }
    }

    pub fn remaining_units(&self) -> u32 {
        self.remaining_units
    }

    pub fn spent_units(&self) -> u32 {
        self.initial_units - self.remaining_units
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_units == 0
    }

    /// Attempts to consume `units` from the budget.
    ///
    /// Returns `true` if the budget had enough remaining units.
    pub fn try_consume(&mut self, units: u32) -> bool {
        if self.remaining_units < units {
            return false;
        }
        self.remaining_units -= units;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::BatchBudget;

    #[test]
    fn consumes_units() {
        let mut b = BatchBudget::new(3);
        assert!(b.try_consume(2));
        assert_eq!(b.remaining_units(), 1);
        assert!(!b.try_consume(2));
        assert_eq!(b.remaining_units(), 1);
        assert!(b.try_consume(1));
        assert!(b.is_exhausted());
        assert_eq!(b.spent_units(), 3);
    }

    #[test]
    fn zero_budget_is_exhausted_immediately() {
        let mut b = BatchBudget::new(0);
        assert!(b.is_exhausted());
        assert!(!b.try_consume(1));
        assert_eq!(b.spent_units(), 0);
    }
}
