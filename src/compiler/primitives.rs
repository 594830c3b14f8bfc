//! Reusable sub-machine emitters. Each primitive allocates its auxiliary
//! states, adds transitions over the whole tape alphabet, and hands back
//! a single exit state with no outgoing transitions, so fragments chain.
//!
//! Conventions: a "rewound" head sits on `>` at cell 0. Navigation and
//! the preamble are the only emitters that assume a particular starting
//! cell; everything else either rewinds first or is documented below.

use super::Compiler;
use crate::types::{State, Symbol, BLANK, LEFT_END, MARK, SEPARATOR, TALLY};
use crate::types::Direction::{Left, Right, Stay};

impl Compiler {
    /// Scans left until the head sits on `>`. Works from any position:
    /// moving left from cell 0 stays at cell 0, so the sentinel is a
    /// fixpoint. The entry state itself is the scan loop.
    pub(crate) fn emit_rewind(&mut self, entry: &State) -> State {
        let at_start = self.new_state("at_start");
        for s in self.alphabet() {
            if s == LEFT_END {
                self.add(entry, s, s, Stay, &at_start);
            } else {
                self.add(entry, s, s, Left, entry);
            }
        }
        at_start
    }

    /// Shifts the input one cell right and writes `>` at cell 0.
    ///
    /// Pre: head at cell 0, cells 0..n-1 hold the input. Post: head on `>`
    /// at cell 0, input in cells 1..n, blank at cell n+1. One carry state
    /// per non-blank tape symbol: each deposits what it carries and picks
    /// up the displaced cell.
    pub(crate) fn emit_preamble(&mut self, entry: &State) -> State {
        let at_start = self.new_state("pre_done");
        let rewind = self.new_state("pre_rw");

        let mut carries: Vec<(Symbol, State)> = Vec::new();
        for s in self.alphabet() {
            if s != BLANK && s != LEFT_END {
                let carry = self.new_state("pre_c");
                carries.push((s, carry));
            }
        }

        // Empty input: just plant the sentinel.
        self.add(entry, BLANK, LEFT_END, Stay, &at_start);
        for (s, carry) in carries.clone() {
            self.add(entry, s, LEFT_END, Right, &carry);
        }

        for (carried, carry) in carries.clone() {
            self.add(&carry, BLANK, carried, Left, &rewind);
            for (next, next_carry) in carries.clone() {
                self.add(&carry, next, carried, Right, &next_carry);
            }
        }

        for s in self.alphabet() {
            if s == LEFT_END {
                self.add(&rewind, s, s, Stay, &at_start);
            } else {
                self.add(&rewind, s, s, Left, &rewind);
            }
        }

        at_start
    }

    /// From `>` at cell 0, moves right past `region + 1` separators and
    /// stops on the first cell of the region's data. Hitting a blank
    /// before enough separators means the region is empty (or not yet
    /// materialized); the head stays on the blank.
    pub(crate) fn emit_nav_to_region(&mut self, entry: &State, region: usize) -> State {
        let mut current = entry.clone();
        for _ in 0..=region {
            let next = self.new_state("nav");
            for s in self.alphabet() {
                if s == SEPARATOR {
                    self.add(&current, s, s, Right, &next);
                } else if s == BLANK {
                    self.add(&current, s, s, Stay, &next);
                } else {
                    self.add(&current, s, s, Right, &current);
                }
            }
            current = next;
        }
        current
    }

    /// Appends a fresh region: scans right to the first blank, writes a
    /// separator, rewinds. Pre and post: head on `>`.
    pub(crate) fn emit_new_region(&mut self, entry: &State) -> State {
        let done = self.new_state("reg_done");
        for s in self.alphabet() {
            if s == BLANK {
                self.add(entry, s, SEPARATOR, Stay, &done);
            } else {
                self.add(entry, s, s, Right, entry);
            }
        }
        self.emit_rewind(&done)
    }

    /// Writes `value` tallies at the end of the tape (the last region).
    /// Pre and post: head on `>`.
    pub(crate) fn emit_write_literal(&mut self, entry: &State, value: u32) -> State {
        if value == 0 {
            return entry.clone();
        }
        let mut current = entry.clone();
        for _ in 0..value {
            let next = self.new_state("lit");
            for s in self.alphabet() {
                if s == BLANK {
                    self.add(&current, s, TALLY, Right, &next);
                } else {
                    self.add(&current, s, s, Right, &current);
                }
            }
            current = next;
        }
        self.emit_rewind(&current)
    }

    /// Counts occurrences of `sym` in the input band, appending one tally
    /// at the tape end per occurrence, then restores the marked input.
    ///
    /// Pre and post: head on `>`. Tally phase: each found `sym` becomes
    /// its `marked` twin, a `1` lands past all regions, and the head
    /// rewinds to resume the scan; the first `#` or blank ends the band.
    /// Restore phase: a single sweep turns every twin back.
    pub(crate) fn emit_count(&mut self, entry: &State, sym: Symbol, marked: Symbol) -> State {
        let scan = self.new_state("cnt_scan");
        let write = self.new_state("cnt_write");
        let back = self.new_state("cnt_back");
        let done = self.new_state("cnt_done");

        self.wire(entry, &scan);

        for s in self.alphabet() {
            if s == sym {
                self.add(&scan, s, marked, Right, &write);
            } else if s == SEPARATOR || s == BLANK {
                self.add(&scan, s, s, Stay, &done);
            } else {
                self.add(&scan, s, s, Right, &scan);
            }
        }

        for s in self.alphabet() {
            if s == BLANK {
                self.add(&write, s, TALLY, Left, &back);
            } else {
                self.add(&write, s, s, Right, &write);
            }
        }

        for s in self.alphabet() {
            if s == LEFT_END {
                self.add(&back, s, s, Right, &scan);
            } else {
                self.add(&back, s, s, Left, &back);
            }
        }

        // done doubles as the leftward scanner of the restore phase.
        let restore = self.new_state("cnt_restore");
        let restored = self.new_state("cnt_rdone");
        for s in self.alphabet() {
            if s == LEFT_END {
                self.add(&done, s, s, Right, &restore);
            } else {
                self.add(&done, s, s, Left, &done);
            }
        }
        for s in self.alphabet() {
            if s == marked {
                self.add(&restore, s, sym, Right, &restore);
            } else if s == SEPARATOR || s == BLANK {
                self.add(&restore, s, s, Stay, &restored);
            } else {
                self.add(&restore, s, s, Right, &restore);
            }
        }

        self.emit_rewind(&restored)
    }

    /// Appends one tally to a region. For the last region the tally lands
    /// on the terminating blank; otherwise it displaces the terminator and
    /// the carry states shift everything after it one cell right.
    ///
    /// Pre: head on `>`. Post: head on `>`.
    pub(crate) fn emit_insert_in_region(&mut self, entry: &State, region: usize) -> State {
        let data = self.emit_nav_to_region(entry, region);

        let at_end = self.new_state("ins_end");
        for s in self.alphabet() {
            if s == TALLY || s == MARK {
                self.add(&data, s, s, Right, &data);
            } else {
                self.add(&data, s, s, Stay, &at_end);
            }
        }

        let done = self.new_state("ins_done");
        let carry_sep = self.new_state("carry_sep");
        let carry_one = self.new_state("carry_one");
        let carry_mark = self.new_state("carry_mark");

        self.add(&at_end, BLANK, TALLY, Stay, &done);
        self.add(&at_end, SEPARATOR, TALLY, Right, &carry_sep);

        self.add(&carry_sep, BLANK, SEPARATOR, Stay, &done);
        self.add(&carry_sep, SEPARATOR, SEPARATOR, Right, &carry_sep);
        self.add(&carry_sep, TALLY, SEPARATOR, Right, &carry_one);
        self.add(&carry_sep, MARK, SEPARATOR, Right, &carry_mark);

        self.add(&carry_one, BLANK, TALLY, Stay, &done);
        self.add(&carry_one, SEPARATOR, TALLY, Right, &carry_sep);
        self.add(&carry_one, TALLY, TALLY, Right, &carry_one);
        self.add(&carry_one, MARK, TALLY, Right, &carry_mark);

        self.add(&carry_mark, BLANK, MARK, Stay, &done);
        self.add(&carry_mark, SEPARATOR, MARK, Right, &carry_sep);
        self.add(&carry_mark, TALLY, MARK, Right, &carry_one);
        self.add(&carry_mark, MARK, MARK, Right, &carry_mark);

        self.emit_rewind(&done)
    }

    /// Turns every `I` in a region back into `1`. Rewinds first, so the
    /// entry head may be anywhere. Post: head on `>`.
    pub(crate) fn emit_restore_region(&mut self, entry: &State, region: usize) -> State {
        let at_start = self.emit_rewind(entry);
        let data = self.emit_nav_to_region(&at_start, region);

        let done = self.new_state("rst_done");
        for s in self.alphabet() {
            if s == MARK {
                self.add(&data, s, TALLY, Right, &data);
            } else if s == TALLY {
                self.add(&data, s, s, Right, &data);
            } else {
                self.add(&data, s, s, Stay, &done);
            }
        }

        self.emit_rewind(&done)
    }

    /// One-to-one equality of two regions' tallies. Marks a tally in `a`,
    /// then one in `b`, until one side runs dry; `a` exhausted is followed
    /// by a check that `b` has nothing left. Both regions are restored on
    /// both branches before control reaches `if_eq` / `if_neq`, each with
    /// the head on `>`.
    ///
    /// Pre: head on `>`.
    pub(crate) fn emit_compare_equal(
        &mut self,
        entry: &State,
        a: usize,
        b: usize,
        if_eq: &State,
        if_neq: &State,
    ) {
        let find_b = self.new_state("ceq_findb");
        let back = self.new_state("ceq_back");
        let a_done = self.new_state("ceq_adone");
        let eq_pre = self.new_state("ceq_eq");
        let neq_pre = self.new_state("ceq_neq");

        // Round 1: find an unmarked tally in a.
        let in_a = self.emit_nav_to_region(entry, a);
        for s in self.alphabet() {
            if s == TALLY {
                self.add(&in_a, s, MARK, Stay, &find_b);
            } else if s == MARK {
                self.add(&in_a, s, s, Right, &in_a);
            } else {
                self.add(&in_a, s, s, Stay, &a_done);
            }
        }

        // Pair it with an unmarked tally in b, or fail.
        let to_b = self.emit_rewind(&find_b);
        let in_b = self.emit_nav_to_region(&to_b, b);
        for s in self.alphabet() {
            if s == TALLY {
                self.add(&in_b, s, MARK, Stay, &back);
            } else if s == MARK {
                self.add(&in_b, s, s, Right, &in_b);
            } else {
                self.add(&in_b, s, s, Stay, &neq_pre);
            }
        }

        // Back to a for the next pair.
        let to_a = self.emit_rewind(&back);
        let in_a2 = self.emit_nav_to_region(&to_a, a);
        for s in self.alphabet() {
            if s == TALLY {
                self.add(&in_a2, s, MARK, Stay, &find_b);
            } else if s == MARK {
                self.add(&in_a2, s, s, Right, &in_a2);
            } else {
                self.add(&in_a2, s, s, Stay, &a_done);
            }
        }

        // a exhausted: any tally left in b breaks equality.
        let to_check = self.emit_rewind(&a_done);
        let in_b_check = self.emit_nav_to_region(&to_check, b);
        for s in self.alphabet() {
            if s == TALLY {
                self.add(&in_b_check, s, s, Stay, &neq_pre);
            } else if s == MARK {
                self.add(&in_b_check, s, s, Right, &in_b_check);
            } else {
                self.add(&in_b_check, s, s, Stay, &eq_pre);
            }
        }

        let eq_a = self.emit_restore_region(&eq_pre, a);
        let eq_b = self.emit_restore_region(&eq_a, b);
        self.wire(&eq_b, if_eq);

        let neq_a = self.emit_restore_region(&neq_pre, a);
        let neq_b = self.emit_restore_region(&neq_a, b);
        self.wire(&neq_b, if_neq);
    }

    /// Ordering comparison |a| <= |b| by the same pairing walk: `a`
    /// running dry first (or simultaneously) means <=, `b` running dry
    /// while `a` still holds a tally means >. Both regions are restored on
    /// both branches.
    ///
    /// Pre: head on `>`.
    pub(crate) fn emit_compare_le(
        &mut self,
        entry: &State,
        a: usize,
        b: usize,
        if_le: &State,
        if_gt: &State,
    ) {
        let find_b = self.new_state("cle_findb");
        let back = self.new_state("cle_back");
        let le_pre = self.new_state("cle_le");
        let gt_pre = self.new_state("cle_gt");

        let in_a = self.emit_nav_to_region(entry, a);
        for s in self.alphabet() {
            if s == TALLY {
                self.add(&in_a, s, MARK, Stay, &find_b);
            } else if s == MARK {
                self.add(&in_a, s, s, Right, &in_a);
            } else {
                self.add(&in_a, s, s, Stay, &le_pre);
            }
        }

        let to_b = self.emit_rewind(&find_b);
        let in_b = self.emit_nav_to_region(&to_b, b);
        for s in self.alphabet() {
            if s == TALLY {
                self.add(&in_b, s, MARK, Stay, &back);
            } else if s == MARK {
                self.add(&in_b, s, s, Right, &in_b);
            } else {
                self.add(&in_b, s, s, Stay, &gt_pre);
            }
        }

        let to_a = self.emit_rewind(&back);
        let in_a2 = self.emit_nav_to_region(&to_a, a);
        for s in self.alphabet() {
            if s == TALLY {
                self.add(&in_a2, s, MARK, Stay, &find_b);
            } else if s == MARK {
                self.add(&in_a2, s, s, Right, &in_a2);
            } else {
                self.add(&in_a2, s, s, Stay, &le_pre);
            }
        }

        let le_a = self.emit_restore_region(&le_pre, a);
        let le_b = self.emit_restore_region(&le_a, b);
        self.wire(&le_b, if_le);

        let gt_a = self.emit_restore_region(&gt_pre, a);
        let gt_b = self.emit_restore_region(&gt_a, b);
        self.wire(&gt_b, if_gt);
    }

    /// Extends `dst` by |src| tallies, leaving `src` unchanged: mark one
    /// tally in `src`, insert one into `dst`, repeat; then restore `src`.
    ///
    /// Pre: head on `>`. Post: head on `>`.
    pub(crate) fn emit_append(&mut self, entry: &State, src: usize, dst: usize) -> State {
        let loop_start = self.new_state("app_loop");
        self.wire(entry, &loop_start);

        let in_src = self.emit_nav_to_region(&loop_start, src);
        let found = self.new_state("app_found");
        let src_done = self.new_state("app_exhausted");
        for s in self.alphabet() {
            if s == TALLY {
                self.add(&in_src, s, MARK, Stay, &found);
            } else if s == MARK {
                self.add(&in_src, s, s, Right, &in_src);
            } else {
                self.add(&in_src, s, s, Stay, &src_done);
            }
        }

        let to_insert = self.emit_rewind(&found);
        let inserted = self.emit_insert_in_region(&to_insert, dst);
        self.wire(&inserted, &loop_start);

        self.emit_restore_region(&src_done, src)
    }
}
