//! Execution state for a single script evaluation (spec.md C3, `Program`).
//!
//! Mirrors `machine_program.hpp`'s register/instruction surface: primary
//! and alternate data stacks, the conditional stack, the legacy operation
//! counter, and a jump register that tracks the most recent
//! `OP_CODESEPARATOR` without ever mutating the underlying [`Script`].

use crate::context::ExecutionContext;
use crate::error::OpError;
use crate::stack::ScriptStack;

/// The legacy non-push operation count limit (BIP-unnamed original Satoshi
/// rule, still enforced outside tapscript).
pub const MAX_OPS_PER_SCRIPT: usize = 201;

/// Execution state threaded through one script (or one P2SH/witness
/// redeem-script replay) evaluation.
///
/// Generic over the stack backing so the interpreter never pays a vtable
/// indirection per opcode; `S` is fixed for the lifetime of one evaluation.
pub struct Program<S: ScriptStack> {
    primary: S,
    alternate: S,
    conditional_stack: Vec<bool>,
    operation_count: usize,
    /// Operation index of the most recent `OP_CODESEPARATOR`, or 0. Used
    /// to build the signature-hash subscript without mutating the script.
    jump: usize,
    pub context: ExecutionContext,
    /// Tapscript sigops budget (BIP342): starts at `50 + witness_size`,
    /// decremented by every signature check; `None` outside tapscript.
    sigops_budget: Option<i64>,
}

impl<S: ScriptStack + Default> Program<S> {
    /// A fresh evaluation with empty stacks (scriptSig, or the first of a
    /// two-phase scriptSig/scriptPubKey pair).
    pub fn new(context: ExecutionContext) -> Self {
        Program {
            primary: S::default(),
            alternate: S::default(),
            conditional_stack: Vec::new(),
            operation_count: 0,
            jump: 0,
            context,
            sigops_budget: None,
        }
    }

    /// Continues evaluation on a stack left behind by a prior phase
    /// (scriptPubKey running on the stack scriptSig produced).
    pub fn with_stack(stack: S, context: ExecutionContext) -> Self {
        Program {
            primary: stack,
            alternate: S::default(),
            conditional_stack: Vec::new(),
            operation_count: 0,
            jump: 0,
            context,
            sigops_budget: None,
        }
    }

    /// Seeds the primary stack from a witness field (BIP141), bottom item
    /// first.
    pub fn with_witness_stack(items: Vec<Vec<u8>>, context: ExecutionContext) -> Self {
        let mut primary = S::default();
        for item in items {
            primary.push(item);
        }
        Program {
            primary,
            alternate: S::default(),
            conditional_stack: Vec::new(),
            operation_count: 0,
            jump: 0,
            context,
            sigops_budget: None,
        }
    }

    /// Evaluates an embedded script (a BIP16 redeem script or BIP141
    /// witness script) inheriting the parent's context but starting with
    /// a fresh conditional stack and operation counter, per consensus'
    /// per-script accounting.
    pub fn child(stack: S, context: ExecutionContext) -> Self {
        Program::with_stack(stack, context)
    }

    /// A tapscript evaluation, which tracks a signature-operations budget
    /// instead of the legacy operation counter (BIP342).
    pub fn for_tapscript(stack: S, context: ExecutionContext, sigops_budget: i64) -> Self {
        let mut program = Program::with_stack(stack, context);
        program.sigops_budget = Some(sigops_budget);
        program
    }
}

impl<S: ScriptStack> Program<S> {
    pub fn primary(&self) -> &S {
        &self.primary
    }

    pub fn primary_mut(&mut self) -> &mut S {
        &mut self.primary
    }

    pub fn alternate(&self) -> &S {
        &self.alternate
    }

    pub fn alternate_mut(&mut self) -> &mut S {
        &mut self.alternate
    }

    pub fn jump_register(&self) -> usize {
        self.jump
    }

    pub fn set_jump_register(&mut self, index: usize) {
        self.jump = index;
    }

    /// Counts one non-push operation against the legacy 201-op limit.
    /// A no-op outside the legacy operation-count regime (tapscript has
    /// no such limit).
    pub fn increment_operation_count(&mut self) -> Result<(), OpError> {
        self.operation_count += 1;
        if self.operation_count > MAX_OPS_PER_SCRIPT {
            return Err(OpError::OpCount);
        }
        Ok(())
    }

    /// Charges `cost` signature operations against the tapscript budget.
    /// A no-op outside tapscript.
    pub fn charge_sigops_budget(&mut self, cost: i64) -> Result<(), OpError> {
        if let Some(budget) = self.sigops_budget.as_mut() {
            *budget -= cost;
            if *budget < 0 {
                return Err(OpError::SigopsBudgetExceeded);
            }
        }
        Ok(())
    }

    /// Opens a new conditional branch (`OP_IF`/`OP_NOTIF`): `condition` is
    /// whether this branch should execute, given the enclosing branches
    /// are all executing.
    pub fn open_condition(&mut self, condition: bool) {
        let enclosing_executing = self.is_executing();
        self.conditional_stack
            .push(enclosing_executing && condition);
    }

    /// Flips the innermost open branch (`OP_ELSE`).
    pub fn negate_condition(&mut self) -> Result<(), OpError> {
        match self.conditional_stack.last_mut() {
            Some(top) => {
                *top = !*top;
                Ok(())
            }
            None => Err(OpError::UnbalancedConditional),
        }
    }

    /// Closes the innermost open branch (`OP_ENDIF`).
    pub fn close_condition(&mut self) -> Result<(), OpError> {
        self.conditional_stack
            .pop()
            .map(|_| ())
            .ok_or(OpError::UnbalancedConditional)
    }

    /// True when every enclosing conditional branch is on its taken path,
    /// i.e. the interpreter should actually execute the current operation.
    pub fn is_executing(&self) -> bool {
        self.conditional_stack.iter().all(|&taken| taken)
    }

    /// True when all opened conditionals have been closed; checked at the
    /// end of a script to reject a dangling `OP_IF`.
    pub fn is_balanced(&self) -> bool {
        self.conditional_stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Forks, ScriptVersion};
    use crate::stack::ContiguousStack;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(Forks::NONE, ScriptVersion::Unversioned, 0)
    }

    #[test]
    fn fresh_program_has_empty_stacks_and_is_balanced() {
        let program = Program::<ContiguousStack>::new(ctx());
        assert_eq!(program.primary().len(), 0);
        assert!(program.is_balanced());
        assert!(program.is_executing());
    }

    #[test]
    fn conditional_nesting_tracks_executing_state() {
        let mut program = Program::<ContiguousStack>::new(ctx());
        program.open_condition(true);
        assert!(program.is_executing());
        program.open_condition(false);
        assert!(!program.is_executing());
        program.negate_condition().unwrap();
        assert!(program.is_executing());
        program.close_condition().unwrap();
        assert!(program.is_executing());
        program.close_condition().unwrap();
        assert!(program.is_balanced());
    }

    #[test]
    fn unbalanced_close_errors() {
        let mut program = Program::<ContiguousStack>::new(ctx());
        assert_eq!(
            program.close_condition().unwrap_err(),
            OpError::UnbalancedConditional
        );
    }

    #[test]
    fn operation_count_limit_enforced() {
        let mut program = Program::<ContiguousStack>::new(ctx());
        for _ in 0..MAX_OPS_PER_SCRIPT {
            program.increment_operation_count().unwrap();
        }
        assert_eq!(
            program.increment_operation_count().unwrap_err(),
            OpError::OpCount
        );
    }

    #[test]
    fn sigops_budget_charges_and_rejects_overspend() {
        let mut program = Program::for_tapscript(ContiguousStack::new(), ctx(), 10);
        program.charge_sigops_budget(5).unwrap();
        program.charge_sigops_budget(5).unwrap();
        assert_eq!(
            program.charge_sigops_budget(1).unwrap_err(),
            OpError::SigopsBudgetExceeded
        );
    }

    #[test]
    fn sigops_budget_is_noop_outside_tapscript() {
        let mut program = Program::<ContiguousStack>::new(ctx());
        program.charge_sigops_budget(1_000_000).unwrap();
    }

    #[test]
    fn with_witness_stack_seeds_primary_bottom_first() {
        let program = Program::<ContiguousStack>::with_witness_stack(
            vec![vec![1], vec![2]],
            ctx(),
        );
        assert_eq!(program.primary().peek().unwrap(), &[2]);
    }

    #[test]
    fn jump_register_tracks_codeseparator_position() {
        let mut program = Program::<ContiguousStack>::new(ctx());
        assert_eq!(program.jump_register(), 0);
        program.set_jump_register(3);
        assert_eq!(program.jump_register(), 3);
    }
}
