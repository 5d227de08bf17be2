use std::hash::Hash;

use cnfgrammar::{CnfGrammar, CnfRule, SymIdx};
use log::{debug, trace};
use num_traits::{AsPrimitive, PrimInt, Unsigned};
use vob::Vob;

use crate::Witness;

/// The offset of cell `(row, col)` in a row-major triangle with `len` columns in row 0.
pub(crate) fn cell_offset(len: usize, row: usize, col: usize) -> usize {
    debug_assert!(row < len && col < len - row);
    // Row k has len - k cells.
    row * len - (row * row.saturating_sub(1)) / 2 + col
}

/// A filled CYK table. Cell `(row, col)` holds the non-terminals which derive the
/// `row + 1` input symbols starting at position `col`.
#[derive(Debug)]
pub struct CykTable<StorageT> {
    len: usize,
    cells: Vec<Vob>,
    /// The symbols tagged `Tag::Root`.
    roots: Vob,
    phantom: std::marker::PhantomData<StorageT>,
}

impl<StorageT: 'static + Hash + PrimInt + Unsigned> CykTable<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Build and fill the table for `input` against `grm`. A `None` in `input` is a symbol which
    /// `grm` does not know: it derives nothing, so no span containing it is ever filled.
    pub fn new<Id: Clone + Eq + Hash, TagT>(
        grm: &CnfGrammar<Id, TagT, StorageT>,
        input: &[Option<SymIdx<StorageT>>],
    ) -> Self {
        CykTable::fill_with(grm, input, |_, _, _, _| ())
    }

    /// As [`new`](#method.new), but calling `placed(row, col, parent, witness)` each time `parent`
    /// is shown to derive cell `(row, col)`. A parent may be placed in the same cell by more than
    /// one witness, in which case `placed` is called once per witness.
    pub fn fill_with<Id: Clone + Eq + Hash, TagT, F>(
        grm: &CnfGrammar<Id, TagT, StorageT>,
        input: &[Option<SymIdx<StorageT>>],
        mut placed: F,
    ) -> Self
    where
        F: FnMut(usize, usize, SymIdx<StorageT>, Witness<StorageT>),
    {
        let len = input.len();
        let symbols_len = usize::from(grm.symbols_len());
        let mut roots = Vob::from_elem(false, symbols_len);
        for sidx in grm.iter_sidxs().filter(|&s| grm.is_root(s)) {
            roots.set(usize::from(sidx), true);
        }

        let mut cells = Vec::with_capacity(len * (len + 1) / 2);
        let mut entries = 0;
        for (col, &t) in input.iter().enumerate() {
            let mut cell = Vob::from_elem(false, symbols_len);
            if let Some(t) = t.filter(|&t| usize::from(t) < symbols_len) {
                let rule = CnfRule::Terminal(t);
                for p in grm.parents(t).iter_set_bits(..) {
                    let p = SymIdx::from_usize(p);
                    if grm.has_rule(p, &rule) {
                        cell.set(usize::from(p), true);
                        placed(0, col, p, Witness::Terminal(t));
                        entries += 1;
                    }
                }
            }
            cells.push(cell);
        }

        let mut common = Vob::from_elem(false, symbols_len);
        for row in 1..len {
            for col in 0..len - row {
                let mut cell = Vob::from_elem(false, symbols_len);
                for i in 0..row {
                    let left = &cells[cell_offset(len, i, col)];
                    let right = &cells[cell_offset(len, row - i - 1, col + i + 1)];
                    for l in left.iter_set_bits(..) {
                        let l = SymIdx::from_usize(l);
                        for r in right.iter_set_bits(..) {
                            let r = SymIdx::from_usize(r);
                            let rule = CnfRule::Binary(l, r);
                            grm.common_parents_into(l, r, &mut common);
                            for p in common.iter_set_bits(..) {
                                let p = SymIdx::from_usize(p);
                                if grm.has_rule(p, &rule) {
                                    trace!(
                                        "({}, {}): {} -> {} {} split after {}",
                                        row,
                                        col,
                                        usize::from(p),
                                        usize::from(l),
                                        usize::from(r),
                                        i + 1
                                    );
                                    cell.set(usize::from(p), true);
                                    placed(
                                        row,
                                        col,
                                        p,
                                        Witness::Split {
                                            split: i + 1,
                                            left: l,
                                            right: r,
                                        },
                                    );
                                    entries += 1;
                                }
                            }
                        }
                    }
                }
                cells.push(cell);
            }
        }
        debug!(
            "Filled CYK table for {} input symbols with {} witnesses",
            len, entries
        );

        CykTable {
            len,
            cells,
            roots,
            phantom: std::marker::PhantomData,
        }
    }

    /// The length of the input this table was filled for.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return the set of symbols in cell `(row, col)`. Panics if the cell doesn't exist.
    pub fn cell(&self, row: usize, col: usize) -> &Vob {
        assert!(row < self.len && col < self.len - row);
        &self.cells[cell_offset(self.len, row, col)]
    }

    /// Does cell `(row, col)` contain `sidx`? Returns `false` for cells outside the table.
    pub fn contains(&self, row: usize, col: usize, sidx: SymIdx<StorageT>) -> bool {
        row < self.len
            && col < self.len - row
            && self.cells[cell_offset(self.len, row, col)]
                .get(usize::from(sidx))
                .unwrap_or(false)
    }

    /// Does the top cell, which covers the whole input, contain the root symbol? Always `false`
    /// for empty input.
    pub fn accepts(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut top = self.cell(self.len - 1, 0).clone();
        top.and(&self.roots);
        top.iter_set_bits(..).next().is_some()
    }
}
