//! The code generator: lowers a decision-procedure program onto a
//! single-tape machine.
//!
//! Tape layout after the preamble:
//!
//! ```text
//! > i1 i2 .. in # v0 # v1 # .. # vk # _ _ ..
//! ```
//!
//! `>` is the left-end sentinel at cell 0, the input band follows, and
//! each variable owns a region holding a unary tally (`1`s, temporarily
//! `I` while a pairing pass is in flight). Every high-level fragment
//! enters and exits with the head on `>` and the tape settled: input
//! symbols unmarked, no residual `I`. Imperative fragments (scan, write,
//! move, loop, if-current) leave the head wherever they end; the next
//! high-level fragment starts with a rewind, so the two styles compose.

mod primitives;

use crate::ast::{BinOp, Expr, Program, Stmt};
use crate::types::{
    CompileError, Direction, State, Symbol, Tm, BLANK, LEFT_END, MARK, SEPARATOR, TALLY, WILDCARD,
};
use std::collections::{BTreeSet, HashMap};

/// Compiles a program into a Turing machine.
///
/// Fails without producing a machine if the program uses a construct the
/// lowering does not support.
pub fn compile(program: &Program) -> Result<Tm, CompileError> {
    Compiler::new().compile(program)
}

/// State carried through one compilation: the machine under construction,
/// the state-name counter, the variable-to-region map, and the break
/// target stack.
pub struct Compiler {
    tm: Tm,
    state_counter: usize,
    vars: HashMap<String, usize>,
    next_region: usize,
    break_targets: Vec<State>,
    alphabet: Vec<Symbol>,
}

impl Compiler {
    fn new() -> Self {
        Self {
            tm: Tm::default(),
            state_counter: 0,
            vars: HashMap::new(),
            next_region: 0,
            break_targets: Vec::new(),
            alphabet: Vec::new(),
        }
    }

    fn compile(mut self, program: &Program) -> Result<Tm, CompileError> {
        self.check_symbols(program)?;
        self.setup_alphabet(program);

        let start = self.new_state("start");
        self.tm.start = start.clone();
        self.tm.accept = "qA".to_string();
        self.tm.reject = "qR".to_string();
        let accept = self.tm.accept.clone();
        let reject = self.tm.reject.clone();
        self.tm.states.insert(accept.clone());
        self.tm.states.insert(reject);

        let current = self.emit_preamble(&start);
        let current = self.lower_stmts(&program.body, current)?;

        // Falling off the end of the program accepts.
        self.wire(&current, &accept);

        debug_assert!(self.break_targets.is_empty());
        self.tm.finalize();
        Ok(self.tm)
    }

    /// Rejects input symbols without a distinct uppercase twin and markers
    /// that collide with reserved glyphs or twins.
    fn check_symbols(&self, program: &Program) -> Result<(), CompileError> {
        for &s in &program.input_alphabet {
            if !s.is_ascii_lowercase() {
                return Err(CompileError::Unsupported(format!(
                    "input symbol '{}' must be an ASCII lowercase letter",
                    s
                )));
            }
        }
        let reserved = [BLANK, LEFT_END, SEPARATOR, TALLY, MARK, WILDCARD];
        for &m in &program.markers {
            if reserved.contains(&m) {
                return Err(CompileError::Unsupported(format!(
                    "marker '{}' is a reserved tape symbol",
                    m
                )));
            }
            if program.input_alphabet.contains(&m)
                || program
                    .input_alphabet
                    .iter()
                    .any(|&s| m == s.to_ascii_uppercase())
            {
                return Err(CompileError::Unsupported(format!(
                    "marker '{}' collides with an input symbol or its marked twin",
                    m
                )));
            }
        }
        Ok(())
    }

    fn setup_alphabet(&mut self, program: &Program) {
        self.tm.input_alphabet = program.input_alphabet.clone();

        let mut tape: BTreeSet<Symbol> = program.input_alphabet.clone();
        tape.insert(BLANK);
        tape.insert(SEPARATOR);
        tape.insert(TALLY);
        tape.insert(MARK);
        tape.insert(LEFT_END);
        for &s in &program.input_alphabet {
            tape.insert(s.to_ascii_uppercase());
        }
        for &m in &program.markers {
            tape.insert(m);
        }

        self.alphabet = tape.iter().copied().collect();
        self.tm.tape_alphabet = tape;
    }

    pub(crate) fn new_state(&mut self, hint: &str) -> State {
        let state = format!("{}{}", hint, self.state_counter);
        self.state_counter += 1;
        self.tm.states.insert(state.clone());
        state
    }

    pub(crate) fn add(
        &mut self,
        from: &State,
        read: Symbol,
        write: Symbol,
        direction: Direction,
        to: &State,
    ) {
        self.tm.add_transition(from, read, write, direction, to);
    }

    pub(crate) fn alphabet(&self) -> Vec<Symbol> {
        self.alphabet.clone()
    }

    /// Fuses `from` into `to` with an identity transition on every tape
    /// symbol not already handled. Accept and reject stay terminal.
    pub(crate) fn wire(&mut self, from: &State, to: &State) {
        if *from == self.tm.accept || *from == self.tm.reject {
            return;
        }
        for s in self.alphabet() {
            let present = self
                .tm
                .delta
                .get(from)
                .is_some_and(|map| map.contains_key(&s));
            if !present {
                self.add(from, s, s, Direction::Stay, to);
            }
        }
    }

    fn declare_fresh(&mut self, name: &str) -> usize {
        let index = self.next_region;
        self.next_region += 1;
        self.vars.insert(name.to_string(), index);
        index
    }

    fn declare_temp(&mut self) -> usize {
        let index = self.next_region;
        self.next_region += 1;
        index
    }

    /// Resolves a name to its region, declaring it (and emitting the
    /// region-append fragment) on first occurrence.
    fn region_of(&mut self, name: &str, at: State) -> (usize, State) {
        match self.vars.get(name).copied() {
            Some(index) => (index, at),
            None => {
                let index = self.declare_fresh(name);
                (index, self.emit_new_region(&at))
            }
        }
    }

    /// The uppercase twin used to mark a counted input symbol.
    fn count_symbols(&self, sym: Symbol) -> Result<(Symbol, Symbol), CompileError> {
        if !self.tm.input_alphabet.contains(&sym) {
            return Err(CompileError::Unsupported(format!(
                "count('{}') refers to a symbol outside the input alphabet",
                sym
            )));
        }
        Ok((sym, sym.to_ascii_uppercase()))
    }

    fn lower_stmts(&mut self, stmts: &[Stmt], entry: State) -> Result<State, CompileError> {
        let mut current = entry;
        for stmt in stmts {
            current = self.lower_stmt(stmt, current)?;
        }
        Ok(current)
    }

    fn lower_stmt(&mut self, stmt: &Stmt, entry: State) -> Result<State, CompileError> {
        match stmt {
            Stmt::Let { name, init } => self.lower_let(name, init, entry),
            Stmt::Assign { name, value } => self.lower_assign(name, value, entry),
            Stmt::For {
                var,
                start,
                end,
                body,
            } => self.lower_for(var, start, end, body, entry),
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => self.lower_if(condition, then_body, else_body, entry),
            Stmt::IfEqual {
                left,
                right,
                then_body,
                else_body,
            } => self.lower_if_equal(left, right, then_body, else_body, entry),
            Stmt::Return(expr) => {
                let desugared = Stmt::If {
                    condition: expr.clone(),
                    then_body: vec![Stmt::Accept],
                    else_body: vec![Stmt::Reject],
                };
                self.lower_stmt(&desugared, entry)
            }
            Stmt::Accept => {
                let accept = self.tm.accept.clone();
                self.wire(&entry, &accept);
                Ok(self.new_state("after_accept"))
            }
            Stmt::Reject => {
                let reject = self.tm.reject.clone();
                self.wire(&entry, &reject);
                Ok(self.new_state("after_reject"))
            }
            Stmt::Scan {
                direction,
                stop_symbols,
            } => self.lower_scan(*direction, stop_symbols, entry),
            Stmt::Write(sym) => self.lower_write(*sym, entry),
            Stmt::Move(direction) => self.lower_move(*direction, entry),
            Stmt::Loop { body } => self.lower_loop(body, entry),
            Stmt::IfCurrent {
                branches,
                else_body,
            } => self.lower_if_current(branches, else_body, entry),
            Stmt::Inc(name) => {
                let rewound = self.emit_rewind(&entry);
                let (index, current) = self.region_of(name, rewound);
                Ok(self.emit_insert_in_region(&current, index))
            }
            Stmt::Append { src, dst } => {
                let rewound = self.emit_rewind(&entry);
                let (src_index, current) = self.region_of(src, rewound);
                let (dst_index, current) = self.region_of(dst, current);
                Ok(self.emit_append(&current, src_index, dst_index))
            }
            Stmt::Break => {
                let target = self.break_targets.last().cloned().ok_or_else(|| {
                    CompileError::Unsupported("break outside of a loop".to_string())
                })?;
                self.wire(&entry, &target);
                Ok(self.new_state("after_break"))
            }
        }
    }

    fn lower_let(&mut self, name: &str, init: &Expr, entry: State) -> Result<State, CompileError> {
        let rewound = self.emit_rewind(&entry);
        let index = self.declare_fresh(name);
        let current = self.emit_new_region(&rewound);

        match init {
            Expr::Int(v) => Ok(self.emit_write_literal(&current, *v)),
            Expr::Count(s) => {
                let (sym, marked) = self.count_symbols(*s)?;
                Ok(self.emit_count(&current, sym, marked))
            }
            Expr::Var(src) => {
                let (src_index, current) = self.region_of(src, current);
                Ok(self.emit_append(&current, src_index, index))
            }
            Expr::Binary { .. } => Err(CompileError::Unsupported(format!(
                "let '{}': initializer must be an integer literal, count(), or a variable",
                name
            ))),
        }
    }

    fn lower_assign(
        &mut self,
        name: &str,
        value: &Expr,
        entry: State,
    ) -> Result<State, CompileError> {
        // First occurrence declares.
        if !self.vars.contains_key(name) {
            return self.lower_let(name, value, entry);
        }

        if let Expr::Binary {
            op: BinOp::Add,
            left,
            right,
        } = value
        {
            if let (Expr::Var(l), Expr::Var(r)) = (&**left, &**right) {
                if l == name {
                    let rewound = self.emit_rewind(&entry);
                    let (src_index, current) = self.region_of(r, rewound);
                    let dst_index = self.vars[name];
                    return Ok(self.emit_append(&current, src_index, dst_index));
                }
            }
        }

        Err(CompileError::Unsupported(format!(
            "assignment to '{}' must have the form {} = {} + y",
            name, name, name
        )))
    }

    fn lower_for(
        &mut self,
        var: &str,
        start: &Expr,
        end: &Expr,
        body: &[Stmt],
        entry: State,
    ) -> Result<State, CompileError> {
        if !matches!(start, Expr::Int(1)) {
            return Err(CompileError::Unsupported(
                "for loop lower bound must be the literal 1".to_string(),
            ));
        }
        let end_name = match end {
            Expr::Var(name) => name,
            _ => {
                return Err(CompileError::Unsupported(
                    "for loop upper bound must be a variable".to_string(),
                ))
            }
        };

        let rewound = self.emit_rewind(&entry);
        let (end_index, current) = self.region_of(end_name, rewound);
        let var_index = self.declare_fresh(var);
        let current = self.emit_new_region(&current);

        let head = self.new_state("for_head");
        self.wire(&current, &head);

        // Each pass increments the loop variable, then continues into the
        // body while var <= end.
        let inc_done = self.emit_insert_in_region(&head, var_index);
        let body_entry = self.new_state("for_body");
        let exit = self.new_state("for_exit");
        self.emit_compare_le(&inc_done, var_index, end_index, &body_entry, &exit);

        let body_done = self.lower_stmts(body, body_entry)?;
        let back = self.emit_rewind(&body_done);
        self.wire(&back, &head);

        Ok(exit)
    }

    fn lower_if(
        &mut self,
        condition: &Expr,
        then_body: &[Stmt],
        else_body: &[Stmt],
        entry: State,
    ) -> Result<State, CompileError> {
        let (op, left, right) = match condition {
            Expr::Binary { op, left, right } if !matches!(op, BinOp::Add | BinOp::Sub) => {
                (*op, left, right)
            }
            _ => {
                return Err(CompileError::Unsupported(
                    "if condition must be a comparison".to_string(),
                ))
            }
        };

        let rewound = self.emit_rewind(&entry);
        let (a, current) = self.operand_region(left, rewound)?;
        let (b, current) = self.operand_region(right, current)?;

        let then_entry = self.new_state("then");
        let else_entry = self.new_state("else");
        let end = self.new_state("endif");

        match op {
            BinOp::Eq => self.emit_compare_equal(&current, a, b, &then_entry, &else_entry),
            BinOp::Ne => self.emit_compare_equal(&current, a, b, &else_entry, &then_entry),
            BinOp::Le => self.emit_compare_le(&current, a, b, &then_entry, &else_entry),
            BinOp::Gt => self.emit_compare_le(&current, a, b, &else_entry, &then_entry),
            BinOp::Ge => self.emit_compare_le(&current, b, a, &then_entry, &else_entry),
            BinOp::Lt => self.emit_compare_le(&current, b, a, &else_entry, &then_entry),
            BinOp::Add | BinOp::Sub => unreachable!(),
        }

        let then_done = self.lower_stmts(then_body, then_entry)?;
        let else_done = if else_body.is_empty() {
            else_entry
        } else {
            self.lower_stmts(else_body, else_entry)?
        };

        self.wire(&then_done, &end);
        self.wire(&else_done, &end);
        Ok(self.emit_rewind(&end))
    }

    /// Normalizes a comparison operand to a region: a variable names its
    /// region; `count()` and literals synthesize a hidden one.
    fn operand_region(
        &mut self,
        expr: &Expr,
        at: State,
    ) -> Result<(usize, State), CompileError> {
        match expr {
            Expr::Var(name) => Ok(self.region_of(name, at)),
            Expr::Count(s) => {
                let (sym, marked) = self.count_symbols(*s)?;
                let index = self.declare_temp();
                let current = self.emit_new_region(&at);
                Ok((index, self.emit_count(&current, sym, marked)))
            }
            Expr::Int(v) => {
                let index = self.declare_temp();
                let current = self.emit_new_region(&at);
                Ok((index, self.emit_write_literal(&current, *v)))
            }
            Expr::Binary { .. } => Err(CompileError::Unsupported(
                "comparison operands must be variables, counts, or literals".to_string(),
            )),
        }
    }

    fn lower_if_equal(
        &mut self,
        left: &str,
        right: &str,
        then_body: &[Stmt],
        else_body: &[Stmt],
        entry: State,
    ) -> Result<State, CompileError> {
        let rewound = self.emit_rewind(&entry);
        let (a, current) = self.region_of(left, rewound);
        let (b, current) = self.region_of(right, current);

        let then_entry = self.new_state("ifeq_then");
        let else_entry = self.new_state("ifeq_else");
        let end = self.new_state("ifeq_end");

        self.emit_compare_equal(&current, a, b, &then_entry, &else_entry);

        let then_done = self.lower_stmts(then_body, then_entry)?;
        let else_done = if else_body.is_empty() {
            else_entry
        } else {
            self.lower_stmts(else_body, else_entry)?
        };

        self.wire(&then_done, &end);
        self.wire(&else_done, &end);
        Ok(self.emit_rewind(&end))
    }

    fn lower_scan(
        &mut self,
        direction: Direction,
        stop_symbols: &BTreeSet<Symbol>,
        entry: State,
    ) -> Result<State, CompileError> {
        let scan = self.new_state("scan");
        let done = self.new_state("scan_done");
        self.wire(&entry, &scan);

        for s in self.alphabet() {
            if stop_symbols.contains(&s) {
                self.add(&scan, s, s, Direction::Stay, &done);
            } else {
                self.add(&scan, s, s, direction, &scan);
            }
        }
        Ok(done)
    }

    fn lower_write(&mut self, sym: Symbol, entry: State) -> Result<State, CompileError> {
        if !self.alphabet.contains(&sym) {
            return Err(CompileError::Unsupported(format!(
                "write '{}': symbol is not in the tape alphabet (declare it as a marker)",
                sym
            )));
        }
        let done = self.new_state("write_done");
        for s in self.alphabet() {
            self.add(&entry, s, sym, Direction::Stay, &done);
        }
        Ok(done)
    }

    fn lower_move(&mut self, direction: Direction, entry: State) -> Result<State, CompileError> {
        let done = self.new_state("move_done");
        for s in self.alphabet() {
            self.add(&entry, s, s, direction, &done);
        }
        Ok(done)
    }

    fn lower_loop(&mut self, body: &[Stmt], entry: State) -> Result<State, CompileError> {
        let head = self.new_state("loop_head");
        let exit = self.new_state("loop_exit");

        self.wire(&entry, &head);
        self.break_targets.push(exit.clone());
        let body_done = self.lower_stmts(body, head.clone())?;
        self.break_targets.pop();

        // The body's exit flows back to the head; the only ways out are
        // break, accept and reject.
        self.wire(&body_done, &head);
        Ok(exit)
    }

    fn lower_if_current(
        &mut self,
        branches: &std::collections::BTreeMap<Symbol, Vec<Stmt>>,
        else_body: &[Stmt],
        entry: State,
    ) -> Result<State, CompileError> {
        let end = self.new_state("ifc_end");
        let mut handled: BTreeSet<Symbol> = BTreeSet::new();

        for (&sym, body) in branches {
            if !self.alphabet.contains(&sym) {
                return Err(CompileError::Unsupported(format!(
                    "if-current branch on '{}': symbol is not in the tape alphabet",
                    sym
                )));
            }
            let branch_entry = self.new_state("ifc_branch");
            self.add(&entry, sym, sym, Direction::Stay, &branch_entry);
            handled.insert(sym);

            let branch_done = self.lower_stmts(body, branch_entry)?;
            self.wire(&branch_done, &end);
        }

        if else_body.is_empty() {
            // Unlisted symbols fall through with no side effects.
            for s in self.alphabet() {
                if !handled.contains(&s) {
                    self.add(&entry, s, s, Direction::Stay, &end);
                }
            }
        } else {
            let else_entry = self.new_state("ifc_else");
            for s in self.alphabet() {
                if !handled.contains(&s) {
                    self.add(&entry, s, s, Direction::Stay, &else_entry);
                }
            }
            let else_done = self.lower_stmts(else_body, else_entry)?;
            self.wire(&else_done, &end);
        }

        Ok(end)
    }
}
