use std::collections::HashMap;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

/// A model (variable assignments) extracted from a SAT result.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub values: HashMap<String, ModelValue>,
}

#[derive(Debug, Clone)]
pub enum ModelValue {
    Int(i64),
    Bool(bool),
}

impl Model {
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ModelValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ModelValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

/// Abstract SMT solver interface.
///
/// Push/pop scoping is the isolation mechanism between test units: a caller
/// declares variables and asserts constraints inside its own scope and pops
/// it afterwards, so nothing leaks into the next unit's solve.
pub trait SmtSolver {
    type Error: std::error::Error;

    /// Declare a new variable.
    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error>;

    /// Assert a constraint.
    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    /// Push a new scope.
    fn push(&mut self) -> Result<(), Self::Error>;

    /// Pop a scope.
    fn pop(&mut self) -> Result<(), Self::Error>;

    /// Check satisfiability.
    fn check_sat(&mut self) -> Result<SatResult, Self::Error>;

    /// Check satisfiability and extract a model if SAT.
    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Self::Error>;

    /// Reset the solver state.
    fn reset(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;

    struct MockSolver {
        sat_result: SatResult,
        check_sat_calls: usize,
        scope_depth: usize,
    }

    impl MockSolver {
        fn new(sat_result: SatResult) -> Self {
            Self {
                sat_result,
                check_sat_calls: 0,
                scope_depth: 0,
            }
        }
    }

    impl SmtSolver for MockSolver {
        type Error = io::Error;

        fn declare_var(&mut self, _name: &str, _sort: &SmtSort) -> Result<(), Self::Error> {
            Ok(())
        }

        fn assert(&mut self, _term: &SmtTerm) -> Result<(), Self::Error> {
            Ok(())
        }

        fn push(&mut self) -> Result<(), Self::Error> {
            self.scope_depth += 1;
            Ok(())
        }

        fn pop(&mut self) -> Result<(), Self::Error> {
            self.scope_depth -= 1;
            Ok(())
        }

        fn check_sat(&mut self) -> Result<SatResult, Self::Error> {
            self.check_sat_calls += 1;
            Ok(self.sat_result.clone())
        }

        fn check_sat_with_model(
            &mut self,
            _var_names: &[(&str, &SmtSort)],
        ) -> Result<(SatResult, Option<Model>), Self::Error> {
            Ok((self.sat_result.clone(), None))
        }

        fn reset(&mut self) -> Result<(), Self::Error> {
            self.scope_depth = 0;
            Ok(())
        }
    }

    // ---------------------------------------------------------------
    // Model getters
    // ---------------------------------------------------------------

    #[test]
    fn model_getters_return_typed_values_only() {
        let mut values = HashMap::new();
        values.insert("x".to_string(), ModelValue::Int(42));
        values.insert("flag".to_string(), ModelValue::Bool(true));
        let model = Model { values };

        assert_eq!(model.get_int("x"), Some(42));
        assert_eq!(model.get_bool("flag"), Some(true));
        assert_eq!(model.get_int("flag"), None);
        assert_eq!(model.get_bool("x"), None);
        assert_eq!(model.get_int("missing"), None);
        assert_eq!(model.get_bool("missing"), None);
    }

    // ---------------------------------------------------------------
    // Scope bookkeeping through the trait object
    // ---------------------------------------------------------------

    #[test]
    fn push_pop_balances_scopes() -> Result<(), io::Error> {
        let mut solver = MockSolver::new(SatResult::Sat);
        solver.push()?;
        solver.push()?;
        solver.pop()?;
        solver.pop()?;
        assert_eq!(solver.scope_depth, 0);
        Ok(())
    }

    #[test]
    fn check_sat_reports_configured_result() -> Result<(), io::Error> {
        let mut solver = MockSolver::new(SatResult::Unknown("timeout".into()));
        assert_eq!(
            solver.check_sat()?,
            SatResult::Unknown("timeout".to_string())
        );
        assert_eq!(solver.check_sat_calls, 1);
        Ok(())
    }
}
