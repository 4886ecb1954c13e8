//! Symbolic script executor.
//!
//! One [`ScriptAnalyzer`] value is a single execution path. Conditional
//! opcodes clone the current state into a sibling that is run to completion
//! from the branch point, so the whole reachable branch tree is enumerated
//! depth-first. Reading past the bottom of the stack draws fresh witness
//! variables: whatever the spender will push at spend time.

use crate::condition_stack::ConditionStack;
use crate::constants::{MAX_PUBKEYS_PER_MULTISIG, MAX_STACK_SIZE};
use crate::error::Error;
use crate::expr::Expr;
use crate::num::{self, ScriptNum};
use crate::opcode::Opcode;
use crate::script::Item;
use crate::stack::Stack;
use crate::{RuleSet, ScriptVersion};

/// A fully analyzed execution path.
#[derive(Debug)]
pub(crate) struct RawBranch {
    /// Pre-order position of the path in the fork tree.
    pub path: u32,
    /// Collected spending conditions, or the error that ended the path along
    /// with the stack at that point.
    pub outcome: Result<Vec<Expr>, (Error, Stack)>,
}

/// Registry of analyzed paths, shared by every branch of one analysis.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    next_path: u32,
    pub branches: Vec<RawBranch>,
}

impl Registry {
    /// Allocates the next path id. Ids are handed out at branch construction,
    /// which makes the sorted registry a pre-order traversal of the fork
    /// tree.
    fn allocate(&mut self) -> u32 {
        let path = self.next_path;
        self.next_path += 1;
        path
    }

    fn record(&mut self, branch: RawBranch) {
        self.branches.push(branch);
    }

    /// Branches sorted into construction (pre-)order.
    pub fn into_branches(mut self) -> Vec<RawBranch> {
        self.branches.sort_by_key(|branch| branch.path);
        self.branches
    }
}

/// State of one execution path under symbolic execution.
pub(crate) struct ScriptAnalyzer<'a> {
    script: &'a [Item],
    /// Next item to execute.
    offset: usize,
    stack: Stack,
    altstack: Stack,
    /// Predicates the spender must satisfy on this path.
    conditions: Vec<Expr>,
    cs: ConditionStack,
    var_counter: u32,
    path: u32,
    version: ScriptVersion,
    rules: RuleSet,
}

impl<'a> ScriptAnalyzer<'a> {
    pub fn new(
        script: &'a [Item],
        version: ScriptVersion,
        rules: RuleSet,
        registry: &mut Registry,
    ) -> Self {
        Self {
            script,
            offset: 0,
            stack: Stack::new(),
            altstack: Stack::new(),
            conditions: Vec::new(),
            cs: ConditionStack::new(),
            var_counter: 0,
            path: registry.allocate(),
            version,
            rules,
        }
    }

    /// Clones the current state into a sibling path.
    fn fork(&self, registry: &mut Registry) -> Self {
        let path = registry.allocate();
        tracing::debug!(
            parent = self.path,
            child = path,
            offset = self.offset,
            "forking"
        );
        Self {
            script: self.script,
            offset: self.offset,
            stack: self.stack.clone(),
            altstack: self.altstack.clone(),
            conditions: self.conditions.clone(),
            cs: self.cs.clone(),
            var_counter: self.var_counter,
            path,
            version: self.version,
            rules: self.rules,
        }
    }

    /// Runs this path to completion and records it in the registry.
    pub fn analyze(mut self, registry: &mut Registry) {
        let outcome = self.run(registry);
        self.renumber_witnesses();
        let branch = match outcome {
            Ok(()) => {
                tracing::debug!(path = self.path, conditions = self.conditions.len(), "path done");
                RawBranch {
                    path: self.path,
                    outcome: Ok(self.conditions),
                }
            }
            Err(error) => {
                tracing::debug!(path = self.path, %error, "path failed");
                RawBranch {
                    path: self.path,
                    outcome: Err((error, self.stack)),
                }
            }
        };
        registry.record(branch);
    }

    fn run(&mut self, registry: &mut Registry) -> Result<(), Error> {
        while self.offset < self.script.len() {
            let item = &self.script[self.offset];
            self.offset += 1;
            self.step(item, registry)?;
            if self.stack.len() + self.altstack.len() > MAX_STACK_SIZE {
                return Err(Error::StackSize);
            }
        }

        if !self.cs.is_empty() {
            return Err(Error::UnbalancedConditional);
        }
        if self.stack.len() > 1 {
            return Err(Error::CleanStack);
        }
        // The script accepts iff the final stack element is truthy; an empty
        // stack draws a witness variable like any other underflow.
        let top = self.take_one();
        self.verify(top, Error::EvalFalse)
    }

    fn step(&mut self, item: &Item, registry: &mut Registry) -> Result<(), Error> {
        let executing = self.cs.all_true();
        match item {
            Item::Push(data) => {
                if executing {
                    self.stack.push(Expr::Bytes(data.clone()));
                }
                Ok(())
            }
            Item::Op(op) => {
                if !executing && !op.is_conditional() {
                    return Ok(());
                }
                tracing::trace!(path = self.path, op = %op, "step");
                self.execute_opcode(*op, executing, registry)
            }
        }
    }

    fn execute_opcode(
        &mut self,
        op: Opcode,
        executing: bool,
        registry: &mut Registry,
    ) -> Result<(), Error> {
        use Opcode::*;

        match op {
            // Constants
            OP_0 => {
                self.stack.push(Expr::Bytes(vec![]));
                Ok(())
            }
            OP_1NEGATE => {
                self.stack.push(Expr::Bytes(ScriptNum::from(-1).to_bytes()));
                Ok(())
            }
            OP_1 | OP_2 | OP_3 | OP_4 | OP_5 | OP_6 | OP_7 | OP_8 | OP_9 | OP_10 | OP_11
            | OP_12 | OP_13 | OP_14 | OP_15 | OP_16 => {
                let value = i64::from(op.code() - 0x50);
                self.stack.push(Expr::Bytes(ScriptNum::from(value).to_bytes()));
                Ok(())
            }

            // Flow control
            OP_NOP => Ok(()),
            OP_IF | OP_NOTIF => {
                if !executing {
                    // The element is not consumed inside a dead region.
                    self.cs.push(false);
                    return Ok(());
                }
                let condition = self.take_one();
                let mut fork = self.fork(registry);
                // This path takes the branch where the condition held, the
                // fork the one where it did not.
                self.cs.push(op == OP_IF);
                fork.cs.push(op == OP_NOTIF);
                if let Some(err) = self.minimal_if_error() {
                    self.conditions.push(Expr::app_tagged(
                        OP_EQUAL,
                        vec![condition.clone(), Expr::Bytes(num::TRUE.to_vec())],
                        err,
                    ));
                    fork.conditions.push(Expr::app_tagged(
                        OP_EQUAL,
                        vec![condition, Expr::Bytes(num::FALSE.to_vec())],
                        err,
                    ));
                } else {
                    self.conditions.push(condition.clone());
                    fork.conditions.push(condition.negate());
                }
                fork.analyze(registry);
                Ok(())
            }
            OP_ELSE => {
                if self.cs.is_empty() {
                    return Err(Error::UnbalancedConditional);
                }
                self.cs.toggle_top();
                Ok(())
            }
            OP_ENDIF => {
                if self.cs.is_empty() {
                    return Err(Error::UnbalancedConditional);
                }
                self.cs.pop();
                Ok(())
            }
            OP_VERIFY => {
                let top = self.take_one();
                self.verify(top, Error::Verify)
            }
            OP_RETURN => Err(Error::OpReturn),

            // Altstack
            OP_TOALTSTACK => {
                let top = self.take_one();
                self.altstack.push(top);
                Ok(())
            }
            OP_FROMALTSTACK => {
                let top = self.altstack.pop().ok_or(Error::InvalidAltstackOperation)?;
                self.stack.push(top);
                Ok(())
            }

            // Stack plumbing
            OP_2DROP => {
                self.take(2);
                Ok(())
            }
            OP_2DUP => {
                let items = self.read(2);
                self.stack.extend(items);
                Ok(())
            }
            OP_3DUP => {
                let items = self.read(3);
                self.stack.extend(items);
                Ok(())
            }
            OP_2OVER => {
                let items = self.read(4);
                self.stack.push(items[0].clone());
                self.stack.push(items[1].clone());
                Ok(())
            }
            OP_2ROT => {
                let mut items = self.take(6);
                items.rotate_left(2);
                self.stack.extend(items);
                Ok(())
            }
            OP_2SWAP => {
                let mut items = self.take(4);
                items.rotate_left(2);
                self.stack.extend(items);
                Ok(())
            }
            OP_IFDUP => {
                let top = self.read_one();
                let mut fork = self.fork(registry);
                // Duplicated iff truthy; the fork keeps the falsy world.
                self.conditions.push(top.clone());
                self.stack.push(top.clone());
                fork.conditions.push(top.negate());
                fork.analyze(registry);
                Ok(())
            }
            OP_DEPTH => {
                let depth = self.stack.len() as i64;
                self.stack.push(Expr::Bytes(ScriptNum::from(depth).to_bytes()));
                Ok(())
            }
            OP_DROP => {
                self.take(1);
                Ok(())
            }
            OP_DUP => {
                let top = self.read_one();
                self.stack.push(top);
                Ok(())
            }
            OP_NIP => {
                let mut items = self.take(2);
                self.stack.push(items.pop().expect("take(2) yields two items; qed"));
                Ok(())
            }
            OP_OVER => {
                let items = self.read(2);
                self.stack.push(items[0].clone());
                Ok(())
            }
            OP_PICK | OP_ROLL => {
                let depth = self.take_concrete_num()?.value();
                if depth < 0 {
                    return Err(Error::InvalidStackOperation);
                }
                let depth = depth as usize + 1;
                self.ensure_depth(depth);
                let index = self.stack.len() - depth;
                let value = if op == OP_PICK {
                    self.stack[index].clone()
                } else {
                    self.stack.remove(index)
                };
                self.stack.push(value);
                Ok(())
            }
            OP_ROT => {
                let mut items = self.take(3);
                items.rotate_left(1);
                self.stack.extend(items);
                Ok(())
            }
            OP_SWAP => {
                let mut items = self.take(2);
                items.rotate_left(1);
                self.stack.extend(items);
                Ok(())
            }
            OP_TUCK => {
                let items = self.take(2);
                self.stack.push(items[1].clone());
                self.stack.extend(items);
                Ok(())
            }
            OP_SIZE => {
                let top = self.read_one();
                self.stack.push(Expr::app(OP_SIZE, vec![top]));
                Ok(())
            }

            // Bitwise and numeric comparison
            OP_EQUAL => {
                let args = self.take(2);
                self.stack.push(Expr::app(OP_EQUAL, args));
                Ok(())
            }
            OP_EQUALVERIFY => {
                let args = self.take(2);
                let condition = Expr::app(OP_EQUAL, args);
                self.verify(condition, Error::EqualVerify)
            }

            // Unary arithmetic
            OP_1ADD | OP_1SUB | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL => {
                let args = self.take(1);
                self.stack.push(Expr::app(op, args));
                Ok(())
            }

            // Binary arithmetic and comparison
            OP_ADD | OP_SUB | OP_BOOLAND | OP_BOOLOR | OP_NUMEQUAL | OP_NUMNOTEQUAL
            | OP_LESSTHAN | OP_GREATERTHAN | OP_LESSTHANOREQUAL | OP_GREATERTHANOREQUAL
            | OP_MIN | OP_MAX => {
                let args = self.take(2);
                self.stack.push(Expr::app(op, args));
                Ok(())
            }
            OP_NUMEQUALVERIFY => {
                let args = self.take(2);
                let condition = Expr::app(OP_NUMEQUAL, args);
                self.verify(condition, Error::NumEqualVerify)
            }
            OP_WITHIN => {
                let args = self.take(3);
                self.stack.push(Expr::app(OP_WITHIN, args));
                Ok(())
            }

            // Crypto, uninterpreted
            OP_RIPEMD160 | OP_SHA1 | OP_SHA256 | OP_HASH160 | OP_HASH256 => {
                let args = self.take(1);
                self.stack.push(Expr::app(op, args));
                Ok(())
            }
            OP_CODESEPARATOR => Ok(()),
            OP_CHECKSIG => {
                let args = self.take(2);
                self.stack.push(Expr::app(OP_CHECKSIG, args));
                Ok(())
            }
            OP_CHECKSIGVERIFY => {
                let args = self.take(2);
                let condition = Expr::app(OP_CHECKSIG, args);
                self.verify(condition, Error::CheckSigVerify)
            }
            OP_CHECKMULTISIG => {
                let result = self.checkmultisig()?;
                self.stack.push(result);
                Ok(())
            }
            OP_CHECKMULTISIGVERIFY => {
                let condition = self.checkmultisig()?;
                self.verify(condition, Error::CheckMultiSigVerify)
            }

            // Timelocks
            OP_CHECKLOCKTIMEVERIFY | OP_CHECKSEQUENCEVERIFY => {
                let top = self.read_one();
                self.conditions.push(Expr::app(op, vec![top]));
                Ok(())
            }

            // Tapscript signature aggregation
            OP_CHECKSIGADD => {
                if self.version != ScriptVersion::SegwitV1 {
                    return Err(Error::BadOpcode);
                }
                let mut args = self.take(3);
                let pubkey = args.pop().expect("take(3) yields three items; qed");
                let n = args.pop().expect("take(3) yields three items; qed");
                let sig = args.pop().expect("take(3) yields three items; qed");
                let checksig = Expr::app(OP_CHECKSIG, vec![sig, pubkey]);
                self.stack.push(Expr::app(OP_ADD, vec![n, checksig]));
                Ok(())
            }

            // No-ops
            OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => {
                Ok(())
            }

            // Disabled opcodes are rejected by the driver pre-scan; reaching
            // one here still fails the path.
            _ if op.is_disabled() => Err(Error::DisabledOpcode(op)),
            _ => Err(Error::BadOpcode),
        }
    }

    /// The minimal-if error applicable under the current version and rules,
    /// if the rule is active at all.
    fn minimal_if_error(&self) -> Option<Error> {
        match self.version {
            ScriptVersion::SegwitV1 => Some(Error::TapscriptMinimalIf),
            ScriptVersion::SegwitV0 if self.rules == RuleSet::All => Some(Error::MinimalIf),
            _ => None,
        }
    }

    /// OP_CHECKMULTISIG shape checks and symbolic result; shared by the
    /// plain and VERIFY forms.
    fn checkmultisig(&mut self) -> Result<Expr, Error> {
        if self.version == ScriptVersion::SegwitV1 {
            return Err(Error::TapscriptCheckMultiSig);
        }

        let key_count = self.take_concrete_num()?.value();
        if !(0..=MAX_PUBKEYS_PER_MULTISIG).contains(&key_count) {
            return Err(Error::PubkeyCount);
        }
        let keys = self.take(key_count as usize);

        let sig_count = self.take_concrete_num()?.value();
        if !(0..=key_count).contains(&sig_count) {
            return Err(Error::SigCount);
        }
        let sigs = self.take(sig_count as usize);

        // The consumed extra element must be null (BIP147).
        let dummy = self.take_one();
        self.conditions.push(Expr::app_tagged(
            Opcode::OP_EQUAL,
            vec![dummy, Expr::Bytes(num::FALSE.to_vec())],
            Error::SigNullDummy,
        ));

        let mut args = sigs;
        args.push(Expr::Bytes(ScriptNum::from(sig_count).to_bytes()));
        args.extend(keys);
        args.push(Expr::Bytes(ScriptNum::from(key_count).to_bytes()));
        Ok(Expr::app(Opcode::OP_CHECKMULTISIG, args))
    }

    /// Pops a condition: concrete values are checked on the spot, symbolic
    /// ones become spending conditions annotated with the failure kind.
    fn verify(&mut self, condition: Expr, error: Error) -> Result<(), Error> {
        match condition {
            Expr::Bytes(bytes) => {
                if num::cast_to_bool(&bytes) {
                    Ok(())
                } else {
                    Err(error)
                }
            }
            Expr::App { op, args, .. } => {
                self.conditions.push(Expr::app_tagged(op, args, error));
                Ok(())
            }
            var @ Expr::Var(_) => {
                self.conditions.push(var);
                Ok(())
            }
        }
    }

    /// Removes the top `count` elements, in bottom-to-top order. Missing
    /// slots are drawn as fresh witness variables.
    fn take(&mut self, count: usize) -> Vec<Expr> {
        self.ensure_depth(count);
        let split = self.stack.len() - count;
        self.stack.split_off(split)
    }

    fn take_one(&mut self) -> Expr {
        self.take(1).pop().expect("take(1) yields one item; qed")
    }

    /// Clones the top `count` elements without removing them, padding the
    /// bottom with fresh witness variables as needed.
    fn read(&mut self, count: usize) -> Vec<Expr> {
        self.ensure_depth(count);
        self.stack[self.stack.len() - count..].to_vec()
    }

    fn read_one(&mut self) -> Expr {
        self.read(1).pop().expect("read(1) yields one item; qed")
    }

    /// Pops a value that must be a concrete script number. Symbolic depths
    /// and counts are out of scope and rejected as overflows.
    fn take_concrete_num(&mut self) -> Result<ScriptNum, Error> {
        let top = self.take_one();
        let bytes = top.as_bytes().ok_or(Error::NumOverflow)?;
        ScriptNum::from_bytes(bytes)
    }

    /// Pads the bottom of the stack with fresh witness variables until it
    /// holds at least `count` elements. Earlier-drawn variables sit closer
    /// to the top: each new draw reaches one slot deeper into the witness.
    fn ensure_depth(&mut self, count: usize) {
        let missing = count.saturating_sub(self.stack.len());
        if missing == 0 {
            return;
        }
        let mut drawn: Vec<Expr> = (0..missing).map(|_| self.fresh_var()).collect();
        drawn.reverse();
        drawn.append(&mut self.stack);
        *self.stack = drawn;
    }

    fn fresh_var(&mut self) -> Expr {
        let var = Expr::Var(self.var_counter);
        self.var_counter += 1;
        var
    }

    /// Rewrites variable indices so `Var(0)` is the deepest slot drawn, i.e.
    /// the first witness element the spender supplies on this path.
    fn renumber_witnesses(&mut self) {
        let total = self.var_counter;
        if total == 0 {
            return;
        }
        for expr in self
            .conditions
            .iter_mut()
            .chain(self.stack.iter_mut())
            .chain(self.altstack.iter_mut())
        {
            renumber(expr, total);
        }
    }
}

fn renumber(expr: &mut Expr, total: u32) {
    match expr {
        Expr::Var(n) => *n = total - 1 - *n,
        Expr::App { args, .. } => {
            for arg in args {
                renumber(arg, total);
            }
        }
        Expr::Bytes(_) => {}
    }
}
